//! Outgoing message descriptions.  Plain data so tests can inspect what would have been sent;
//! turned into serenity builders only at the directory boundary.

use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateMessage,
    Timestamp,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notice {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub buttons: Vec<Button>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub primary: bool,
}

impl Notice {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn to_create_message(&self) -> CreateMessage {
        let mut msg = CreateMessage::new();
        if let Some(content) = &self.content {
            msg = msg.content(content);
        }
        if let Some(embed) = &self.embed {
            msg = msg.embed(embed.to_create_embed());
        }
        if !self.buttons.is_empty() {
            let buttons = self
                .buttons
                .iter()
                .map(|button| {
                    CreateButton::new(button.custom_id)
                        .label(button.label)
                        .style(if button.primary {
                            ButtonStyle::Primary
                        } else {
                            ButtonStyle::Secondary
                        })
                })
                .collect();
            msg = msg.components(vec![CreateActionRow::Buttons(buttons)]);
        }
        msg
    }
}

impl Embed {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            color,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    fn to_create_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .color(self.color)
            .timestamp(Timestamp::now());
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        for (name, value) in &self.fields {
            embed = embed.field(name, value, false);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }
}

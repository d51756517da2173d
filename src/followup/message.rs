use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const MESSAGE_LINK_BASE: &str = "https://wa.me/";

/// A message ready to hand to the messaging app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub phone_number: String,
    pub text: String,
    pub link: String,
}

impl OutboundMessage {
    /// Render `template` for `phone_number` and build the click-to-chat link.
    ///
    /// `{number}` in the template is replaced with the number as logged.
    pub fn compose(phone_number: &str, template: &str) -> Result<Self> {
        let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            bail!("cannot build a message link for '{phone_number}': no digits");
        }

        let text = template.replace("{number}", phone_number);
        let link = if text.is_empty() {
            format!("{MESSAGE_LINK_BASE}{digits}")
        } else {
            format!("{MESSAGE_LINK_BASE}{digits}?text={}", urlencoding::encode(&text))
        };

        Ok(Self {
            phone_number: phone_number.to_string(),
            text,
            link,
        })
    }
}

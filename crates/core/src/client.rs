use serde::{Deserialize, Serialize};

/// Per-tenant settings. Typed with explicit defaults; settings rows
/// written by older frontends may carry extra keys, which are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientSettings {
    /// Preferred report window length in days when the UI offers a default.
    #[serde(default)]
    pub default_report_days: Option<u32>,
    /// Address notified when a report is generated, if different from
    /// the primary contact.
    #[serde(default)]
    pub report_recipient: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// A tenant organization. Owns its assets and events by reference;
/// deleting a client cascades to both (enforced by the store schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    /// Unique across tenants.
    pub name: String,
    pub contact_email: String,
    #[serde(default)]
    pub settings: ClientSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_when_absent() {
        let json = r#"{
            "client_id": "c1",
            "name": "Acme Corp",
            "contact_email": "soc@acme.example"
        }"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.settings, ClientSettings::default());
    }

    #[test]
    fn unknown_settings_keys_are_ignored() {
        let json = r#"{"default_report_days": 30, "legacy_theme": "dark"}"#;
        let settings: ClientSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.default_report_days, Some(30));
    }
}

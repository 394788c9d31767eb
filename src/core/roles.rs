//! Role assignment: mapping script speakers to either the user or an AI voice.
//!
//! Built once from the session init payload and read-only afterwards. Speaker
//! keys are trimmed and uppercased to match the sequencer's normalization.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Synthesized voice gender for an AI-controlled character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    /// Parses a client-supplied gender label. Unknown or absent labels fall
    /// back to a neutral voice rather than failing the session.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "MALE" => Gender::Male,
            "FEMALE" => Gender::Female,
            _ => Gender::Neutral,
        }
    }
}

/// Who speaks a given script line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The line must be spoken by the user and verified.
    UserControlled,
    /// The line is synthesized with a voice of the given gender.
    AiVoice(Gender),
}

/// Speaker name to role mapping for one session.
///
/// Constructed from the init payload's `user_roles` set and
/// `ai_character_genders` map; never mutated after construction.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    user_roles: HashSet<String>,
    ai_genders: HashMap<String, Gender>,
}

impl RoleAssignment {
    pub fn new(user_roles: HashSet<String>, ai_genders: HashMap<String, Gender>) -> Self {
        Self {
            user_roles: user_roles
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .collect(),
            ai_genders: ai_genders
                .into_iter()
                .map(|(s, g)| (s.trim().to_uppercase(), g))
                .collect(),
        }
    }

    /// Resolves a speaker to a role. Speakers in neither map get `None` and
    /// their lines are skipped by the session loop.
    pub fn resolve(&self, speaker: &str) -> Option<Role> {
        if self.user_roles.contains(speaker) {
            Some(Role::UserControlled)
        } else {
            self.ai_genders.get(speaker).map(|g| Role::AiVoice(*g))
        }
    }
}

/// Gender to voice identity mapping for the configured synthesis provider.
#[derive(Debug, Clone)]
pub struct VoiceMap {
    pub male: String,
    pub female: String,
    pub neutral: String,
}

impl VoiceMap {
    pub fn voice_id(&self, gender: Gender) -> &str {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
            Gender::Neutral => &self.neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> RoleAssignment {
        let mut genders = HashMap::new();
        genders.insert("mary ".to_string(), Gender::Female);
        RoleAssignment::new(
            ["jack".to_string()].into_iter().collect(),
            genders,
        )
    }

    #[test]
    fn test_resolve_normalizes_speaker_keys() {
        let roles = assignment();
        assert_eq!(roles.resolve("JACK"), Some(Role::UserControlled));
        assert_eq!(roles.resolve("MARY"), Some(Role::AiVoice(Gender::Female)));
    }

    #[test]
    fn test_unknown_speaker_resolves_to_none() {
        assert_eq!(assignment().resolve("NARRATOR"), None);
    }

    #[test]
    fn test_gender_deserializes_uppercase() {
        let g: Gender = serde_json::from_str("\"FEMALE\"").unwrap();
        assert_eq!(g, Gender::Female);
        assert!(serde_json::from_str::<Gender>("\"female\"").is_err());
    }

    #[test]
    fn test_from_label_defaults_to_neutral() {
        assert_eq!(Gender::from_label("male"), Gender::Male);
        assert_eq!(Gender::from_label(" FEMALE "), Gender::Female);
        assert_eq!(Gender::from_label("NEUTRAL"), Gender::Neutral);
        assert_eq!(Gender::from_label("nonbinary"), Gender::Neutral);
        assert_eq!(Gender::from_label(""), Gender::Neutral);
    }

    #[test]
    fn test_voice_map_lookup() {
        let map = VoiceMap {
            male: "m".to_string(),
            female: "f".to_string(),
            neutral: "n".to_string(),
        };
        assert_eq!(map.voice_id(Gender::Male), "m");
        assert_eq!(map.voice_id(Gender::Female), "f");
        assert_eq!(map.voice_id(Gender::Neutral), "n");
    }
}

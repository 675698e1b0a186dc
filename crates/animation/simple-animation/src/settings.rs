//! Component settings and the editor-style state list.

use serde::{Deserialize, Serialize};
use simple_animation_core::WrapMode;

/// Name of the state bound to the component's default clip.
pub const DEFAULT_STATE_NAME: &str = "Default";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorSettings {
    /// Play the default state when the component is enabled.
    pub play_automatically: bool,
    /// Reported to hosts; states keep the wrap mode of their clip.
    pub wrap_mode: WrapMode,
    pub keep_stopped_playables_connected: bool,
    /// Clip bound to the "Default" state.
    pub default_clip: Option<String>,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            play_automatically: true,
            wrap_mode: WrapMode::default(),
            keep_stopped_playables_connected: true,
            default_clip: None,
        }
    }
}

/// One entry of the state list: a clip and the name the state is added under.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSpec {
    pub clip: Option<String>,
    pub name: String,
    pub default_state: bool,
}

impl StateSpec {
    pub fn new(clip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            clip: Some(clip.into()),
            name: name.into(),
            default_state: false,
        }
    }

    fn default_for(clip: Option<&str>) -> Self {
        Self {
            clip: clip.map(str::to_string),
            name: DEFAULT_STATE_NAME.to_string(),
            default_state: true,
        }
    }
}

/// Settings plus state list, as stored for one animated object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rig {
    pub settings: AnimatorSettings,
    pub states: Vec<StateSpec>,
}

impl Rig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Normalize a state list:
/// - index 0 is a default state named "Default" bound to `default_clip`,
///   inserted in front when missing;
/// - no other entry is flagged default;
/// - empty names take the clip's name;
/// - duplicate names get a " (n)" suffix.
pub fn validate_states(states: &mut Vec<StateSpec>, default_clip: Option<&str>) {
    if states.is_empty() {
        states.push(StateSpec::default_for(default_clip));
    }

    if !states[0].default_state || states[0].name != DEFAULT_STATE_NAME {
        states.insert(0, StateSpec::default_for(default_clip));
    }
    states[0].clip = default_clip.map(str::to_string);

    for state in states.iter_mut().skip(1) {
        state.default_state = false;
    }

    let mut names: Vec<String> = Vec::with_capacity(states.len());
    for state in states.iter_mut() {
        if state.name.is_empty() {
            if let Some(clip) = &state.clip {
                state.name = clip.clone();
            }
        }
        state.name = unique_name(&names, &state.name);
        names.push(state.name.clone());
    }
}

fn unique_name(taken: &[String], name: &str) -> String {
    if !taken.iter().any(|t| t == name) {
        return name.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{name} ({n})");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(states: &[StateSpec]) -> Vec<&str> {
        states.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn empty_list_gets_a_default_state() {
        let mut states = Vec::new();
        validate_states(&mut states, Some("idle"));
        assert_eq!(states, vec![StateSpec::default_for(Some("idle"))]);
    }

    #[test]
    fn default_state_is_inserted_in_front() {
        let mut states = vec![StateSpec::new("walk", "walk")];
        validate_states(&mut states, None);
        assert_eq!(names(&states), ["Default", "walk"]);
        assert!(states[0].default_state);
        assert_eq!(states[0].clip, None);
    }

    #[test]
    fn default_clip_follows_settings() {
        let mut states = vec![StateSpec::default_for(Some("idle"))];
        validate_states(&mut states, Some("run"));
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].clip.as_deref(), Some("run"));
    }

    #[test]
    fn only_first_state_is_default() {
        let mut states = vec![
            StateSpec::default_for(None),
            StateSpec {
                default_state: true,
                ..StateSpec::new("wave", "hello")
            },
        ];
        validate_states(&mut states, None);
        assert!(!states[1].default_state);
    }

    #[test]
    fn names_are_filled_and_made_unique() {
        let mut states = vec![
            StateSpec::new("jump", ""),
            StateSpec::new("jump", ""),
            StateSpec::new("jump", "jump"),
            StateSpec {
                clip: None,
                ..StateSpec::default()
            },
        ];
        validate_states(&mut states, Some("walk"));
        assert_eq!(
            names(&states),
            ["Default", "jump", "jump (1)", "jump (2)", ""]
        );
    }

    #[test]
    fn unique_name_skips_taken_suffixes() {
        let taken = vec!["a".to_string(), "a (1)".to_string()];
        assert_eq!(unique_name(&taken, "a"), "a (2)");
        assert_eq!(unique_name(&taken, "b"), "b");
    }

    #[test]
    fn settings_defaults_from_partial_json() {
        let rig = Rig::from_json(r#"{ "settings": { "default_clip": "idle" } }"#).unwrap();
        assert!(rig.settings.play_automatically);
        assert!(rig.settings.keep_stopped_playables_connected);
        assert_eq!(rig.settings.default_clip.as_deref(), Some("idle"));
        assert!(rig.states.is_empty());
    }
}

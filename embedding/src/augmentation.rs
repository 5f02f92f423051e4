//! Per-sector text augmentation: a single text corpus is projected into five
//! different semantic spaces by prepending sector-specific context markers;
//! the underlying model is unchanged.

use crate::types::{EmotionState, ReflectiveInsights, TemporalContext};

pub fn augment_episodic(text: &str, ctx: &TemporalContext) -> String {
    let mut markers = vec![
        format!("[TIME:{}]", ctx.timestamp),
        format!("[SESSION:{}]", ctx.session_id),
    ];
    if let Some(seq) = ctx.sequence {
        markers.push(format!("[SEQUENCE:{}]", seq));
    }
    if let Some(duration) = ctx.duration_s {
        markers.push(format!("[DURATION:{}s]", duration));
    }
    if let Some(location) = &ctx.location {
        if !location.is_empty() {
            markers.push(format!("[LOCATION:{}]", location));
        }
    }
    if !ctx.participants.is_empty() {
        markers.push(format!("[PARTICIPANTS:{}]", ctx.participants.join(",")));
    }
    format!("{} {}", markers.join(" "), text)
}

pub fn augment_semantic(text: &str) -> String {
    text.to_string()
}

pub fn augment_procedural(text: &str) -> String {
    format!("[PROCEDURE] [STEPS] [HOW-TO] {}", text)
}

pub fn augment_emotional(text: &str, state: &EmotionState) -> String {
    let valence = if state.valence > 0.0 {
        "POSITIVE"
    } else if state.valence < 0.0 {
        "NEGATIVE"
    } else {
        "NEUTRAL"
    };
    let arousal = if state.arousal > 0.7 {
        "HIGH"
    } else if state.arousal > 0.3 {
        "MEDIUM"
    } else {
        "LOW"
    };
    let dominance = if state.dominance > 0.0 {
        "DOMINANT"
    } else if state.dominance < 0.0 {
        "SUBMISSIVE"
    } else {
        "NEUTRAL"
    };

    let mut markers = vec![
        format!("[VALENCE:{}]", valence),
        format!("[AROUSAL:{}]", arousal),
        format!("[DOMINANCE:{}]", dominance),
    ];
    if let Some(emotion) = &state.primary_emotion {
        if !emotion.is_empty() {
            markers.push(format!("[EMOTION:{}]", emotion.to_uppercase()));
        }
    }
    format!("{} {}", markers.join(" "), text)
}

pub fn augment_reflective(text: &str, insights: &ReflectiveInsights) -> String {
    let mut markers = vec!["[REFLECTION]".to_string(), "[META-COGNITION]".to_string()];
    if !insights.insights.is_empty() {
        markers.push(format!("[INSIGHTS:{}]", insights.insights.join(";")));
    }
    format!("{} {}", markers.join(" "), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episodic_omits_optional_markers_when_empty() {
        let ctx = TemporalContext {
            timestamp: "2026-01-01T00:00:00Z".into(),
            session_id: "s1".into(),
            ..Default::default()
        };
        let augmented = augment_episodic("hello", &ctx);
        assert_eq!(augmented, "[TIME:2026-01-01T00:00:00Z] [SESSION:s1] hello");
    }

    #[test]
    fn emotional_labels_follow_thresholds() {
        let state = EmotionState {
            valence: 0.5,
            arousal: 0.8,
            dominance: -0.2,
            primary_emotion: Some("joy".into()),
        };
        let augmented = augment_emotional("hi", &state);
        assert_eq!(
            augmented,
            "[VALENCE:POSITIVE] [AROUSAL:HIGH] [DOMINANCE:SUBMISSIVE] [EMOTION:JOY] hi"
        );
    }

    #[test]
    fn semantic_is_raw_text() {
        assert_eq!(augment_semantic("hi"), "hi");
    }

    #[test]
    fn reflective_includes_insights_when_present() {
        let insights = ReflectiveInsights {
            insights: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            augment_reflective("hi", &insights),
            "[REFLECTION] [META-COGNITION] [INSIGHTS:a;b] hi"
        );
    }
}

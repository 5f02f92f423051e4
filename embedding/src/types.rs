use serde::{Deserialize, Serialize};

/// One of the five fixed semantic projections every memory is embedded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    Episodic,
    Semantic,
    Procedural,
    Emotional,
    Reflective,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Episodic,
        Sector::Semantic,
        Sector::Procedural,
        Sector::Emotional,
        Sector::Reflective,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Sector::Episodic => "episodic",
            Sector::Semantic => "semantic",
            Sector::Procedural => "procedural",
            Sector::Emotional => "emotional",
            Sector::Reflective => "reflective",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Sector> {
        match tag {
            "episodic" => Some(Sector::Episodic),
            "semantic" => Some(Sector::Semantic),
            "procedural" => Some(Sector::Procedural),
            "emotional" => Some(Sector::Emotional),
            "reflective" => Some(Sector::Reflective),
            _ => None,
        }
    }
}

pub type Vector = Vec<f32>;

/// All five sector vectors for a single memory. All five share the same
/// dimension; the dimension is fixed by the active model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorEmbeddings {
    pub episodic: Vector,
    pub semantic: Vector,
    pub procedural: Vector,
    pub emotional: Vector,
    pub reflective: Vector,
}

impl SectorEmbeddings {
    pub fn get(&self, sector: Sector) -> &Vector {
        match sector {
            Sector::Episodic => &self.episodic,
            Sector::Semantic => &self.semantic,
            Sector::Procedural => &self.procedural,
            Sector::Emotional => &self.emotional,
            Sector::Reflective => &self.reflective,
        }
    }

    pub fn set(&mut self, sector: Sector, vector: Vector) {
        match sector {
            Sector::Episodic => self.episodic = vector,
            Sector::Semantic => self.semantic = vector,
            Sector::Procedural => self.procedural = vector,
            Sector::Emotional => self.emotional = vector,
            Sector::Reflective => self.reflective = vector,
        }
    }
}

/// Optional context accompanying an episodic generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalContext {
    pub timestamp: String,
    pub session_id: String,
    pub sequence: Option<u64>,
    pub duration_s: Option<f64>,
    pub location: Option<String>,
    pub participants: Vec<String>,
}

/// Optional context accompanying an emotional generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotionState {
    pub valence: f32,
    pub arousal: f32,
    pub dominance: f32,
    pub primary_emotion: Option<String>,
}

/// Optional context accompanying a reflective generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectiveInsights {
    pub insights: Vec<String>,
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum EmbeddingError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

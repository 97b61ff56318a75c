use serde::{Deserialize, Serialize};

/// Kind of source material, steers planning and writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    ResearchPaper,
    Career,
    LanguageLearning,
    Philosophy,
    #[default]
    TechNews,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::ResearchPaper,
        ContentCategory::Career,
        ContentCategory::LanguageLearning,
        ContentCategory::Philosophy,
        ContentCategory::TechNews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::ResearchPaper => "research_paper",
            ContentCategory::Career => "career",
            ContentCategory::LanguageLearning => "language_learning",
            ContentCategory::Philosophy => "philosophy",
            ContentCategory::TechNews => "tech_news",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentCategory::ResearchPaper => "Research Paper",
            ContentCategory::Career => "Career & Self-Growth",
            ContentCategory::LanguageLearning => "Language Learning",
            ContentCategory::Philosophy => "Philosophy & Essay",
            ContentCategory::TechNews => "Tech & Trends",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ContentCategory::ResearchPaper => "Academic papers, technical reports and research material",
            ContentCategory::Career => "Career advice, self-improvement and motivational content",
            ContentCategory::LanguageLearning => "Conversation tips, expressions and shadowing practice",
            ContentCategory::Philosophy => "Life philosophy, essays and reflective writing",
            ContentCategory::TechNews => "News, trend reports and technology updates",
        }
    }

    pub fn recommended_modes(&self) -> &'static [NarrativeMode] {
        match self {
            ContentCategory::ResearchPaper => &[NarrativeMode::Mentor],
            ContentCategory::Career | ContentCategory::LanguageLearning => {
                &[NarrativeMode::Mentor, NarrativeMode::Friend]
            }
            ContentCategory::Philosophy => {
                &[NarrativeMode::Mentor, NarrativeMode::Friend, NarrativeMode::Lover]
            }
            ContentCategory::TechNews => &[NarrativeMode::RadioShow, NarrativeMode::Mentor],
        }
    }
}

/// Voice and relationship the narrator takes with the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeMode {
    #[default]
    Mentor,
    Friend,
    Lover,
    RadioShow,
}

impl NarrativeMode {
    pub const ALL: [NarrativeMode; 4] = [
        NarrativeMode::Mentor,
        NarrativeMode::Friend,
        NarrativeMode::Lover,
        NarrativeMode::RadioShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeMode::Mentor => "mentor",
            NarrativeMode::Friend => "friend",
            NarrativeMode::Lover => "lover",
            NarrativeMode::RadioShow => "radio_show",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NarrativeMode::Mentor => "Mentor",
            NarrativeMode::Friend => "Friend",
            NarrativeMode::Lover => "Partner",
            NarrativeMode::RadioShow => "Radio Show",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NarrativeMode::Mentor => "A patient expert explaining the material step by step",
            NarrativeMode::Friend => "A close friend talking it through casually",
            NarrativeMode::Lover => "A warm, intimate narrator speaking softly to the listener",
            NarrativeMode::RadioShow => "Two hosts discussing the material like a radio programme",
        }
    }
}

/// Catalog entry for GET /api/v1/categories
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryOption {
    pub id: ContentCategory,
    pub label: String,
    pub description: String,
    pub recommended_modes: Vec<NarrativeMode>,
}

/// Catalog entry for GET /api/v1/modes
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ModeOption {
    pub id: NarrativeMode,
    pub label: String,
    pub description: String,
}

pub fn category_options() -> Vec<CategoryOption> {
    ContentCategory::ALL
        .iter()
        .map(|c| CategoryOption {
            id: *c,
            label: c.label().to_string(),
            description: c.description().to_string(),
            recommended_modes: c.recommended_modes().to_vec(),
        })
        .collect()
}

pub fn mode_options() -> Vec<ModeOption> {
    NarrativeMode::ALL
        .iter()
        .map(|m| ModeOption {
            id: *m,
            label: m.label().to_string(),
            description: m.description().to_string(),
        })
        .collect()
}

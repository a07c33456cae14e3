use serde::{Deserialize, Serialize};

use crate::error::{QuizError, Result};

/// Learners the quiz is set up for. The first one is the default.
pub const LEARNERS: [&str; 5] = ["西瓜", "柚子", "小樂", "阿噗", "安安"];

/// Stored stand-in for "every category".
pub const ALL_CATEGORIES_SENTINEL: &str = "全部";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "生活行為")]
    DailyLife,
    #[serde(rename = "情緒表情")]
    Emotion,
    #[serde(rename = "品格態度")]
    Character,
    #[serde(rename = "學習成長")]
    Learning,
    #[serde(rename = "人際互動")]
    Social,
    #[serde(rename = "故事典故")]
    Allusion,
    #[serde(rename = "狀態感覺")]
    State,
    #[serde(rename = "時間流程")]
    Time,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::DailyLife,
        Category::Emotion,
        Category::Character,
        Category::Learning,
        Category::Social,
        Category::Allusion,
        Category::State,
        Category::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DailyLife => "生活行為",
            Category::Emotion => "情緒表情",
            Category::Character => "品格態度",
            Category::Learning => "學習成長",
            Category::Social => "人際互動",
            Category::Allusion => "故事典故",
            Category::State => "狀態感覺",
            Category::Time => "時間流程",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Category::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Which categories a draw may come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum CategoryFilter {
    All,
    Only(Vec<Category>),
}

impl CategoryFilter {
    /// Normalizes a raw selection: the sentinel wins, unknown names are
    /// dropped and an empty selection means everything.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        if names
            .iter()
            .any(|n| n.as_ref().trim() == ALL_CATEGORIES_SENTINEL)
        {
            return CategoryFilter::All;
        }

        let mut picked: Vec<Category> = Vec::new();
        for name in names {
            if let Some(c) = Category::from_str(name.as_ref()) {
                if !picked.contains(&c) {
                    picked.push(c);
                }
            }
        }

        if picked.is_empty() {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(picked)
        }
    }

    pub fn allows(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(set) => set.contains(&category),
        }
    }

    pub fn label(&self) -> String {
        match self {
            CategoryFilter::All => ALL_CATEGORIES_SENTINEL.to_string(),
            CategoryFilter::Only(set) => set
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join("、"),
        }
    }
}

impl From<Vec<String>> for CategoryFilter {
    fn from(names: Vec<String>) -> Self {
        CategoryFilter::from_names(&names)
    }
}

impl From<CategoryFilter> for Vec<String> {
    fn from(filter: CategoryFilter) -> Self {
        match filter {
            CategoryFilter::All => vec![ALL_CATEGORIES_SENTINEL.to_string()],
            CategoryFilter::Only(set) => set.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

/// Question types a learner can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionMode {
    #[serde(rename = "mc_meaning")]
    MeaningChoice,
    #[serde(rename = "fill_drag")]
    FillBlank,
    #[serde(rename = "scene")]
    SceneChoice,
    #[serde(rename = "tf")]
    TrueFalse,
}

impl QuestionMode {
    pub const ALL: [QuestionMode; 4] = [
        QuestionMode::MeaningChoice,
        QuestionMode::FillBlank,
        QuestionMode::SceneChoice,
        QuestionMode::TrueFalse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionMode::MeaningChoice => "mc_meaning",
            QuestionMode::FillBlank => "fill_drag",
            QuestionMode::SceneChoice => "scene",
            QuestionMode::TrueFalse => "tf",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mc_meaning" | "meaning" | "mc" => Some(QuestionMode::MeaningChoice),
            "fill_drag" | "fill" | "blank" => Some(QuestionMode::FillBlank),
            "scene" | "scenario" => Some(QuestionMode::SceneChoice),
            "tf" | "judgment" | "true_false" => Some(QuestionMode::TrueFalse),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionMode::MeaningChoice => "Pick the idiom for the meaning",
            QuestionMode::FillBlank => "Fill in the missing character",
            QuestionMode::SceneChoice => "Pick the idiom for the scene",
            QuestionMode::TrueFalse => "Does this meaning fit?",
        }
    }

    /// Tag recorded in the wrongbook when a question of this mode is missed.
    pub fn miss_tag(&self) -> &'static str {
        match self {
            QuestionMode::MeaningChoice => "choice",
            QuestionMode::FillBlank => "fill-blank",
            QuestionMode::SceneChoice => "scenario",
            QuestionMode::TrueFalse => "judgment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdiomRecord {
    pub id: String,
    pub idiom: String,
    pub meaning: String,
    pub story: String,
    pub zhuyin: String,
    pub category: Category,
    #[serde(default, alias = "youtube_id", skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
}

impl IdiomRecord {
    pub fn char_count(&self) -> usize {
        self.idiom.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerSettings {
    #[serde(rename = "child")]
    pub learner: String,
    pub categories: CategoryFilter,
    pub count: usize,
    #[serde(rename = "avoidDays")]
    pub avoid_days: u32,
    pub modes: Vec<QuestionMode>,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            learner: LEARNERS[0].to_string(),
            categories: CategoryFilter::All,
            count: 10,
            avoid_days: 3,
            modes: QuestionMode::ALL.to_vec(),
        }
    }
}

impl LearnerSettings {
    /// Checks and tidies settings before they are saved.
    pub fn normalized(mut self) -> Result<Self> {
        if !LEARNERS.contains(&self.learner.as_str()) {
            return Err(QuizError::InvalidSettings(format!(
                "unknown learner '{}', expected one of: {}",
                self.learner,
                LEARNERS.join(", ")
            )));
        }
        if self.count == 0 {
            return Err(QuizError::InvalidSettings(
                "question count must be at least 1".to_string(),
            ));
        }
        if let CategoryFilter::Only(set) = &self.categories {
            if set.is_empty() {
                self.categories = CategoryFilter::All;
            }
        }

        let mut modes: Vec<QuestionMode> = Vec::new();
        for m in self.modes {
            if !modes.contains(&m) {
                modes.push(m);
            }
        }
        if modes.is_empty() {
            modes.push(QuestionMode::MeaningChoice);
        }
        self.modes = modes;

        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

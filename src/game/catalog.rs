//! Category seed data and the coarse item knowledge built on it.
//!
//! Information Hiding:
//! - The hard-coded tag tables stay private to `StaticCatalog`
//! - Everything else asks through `ItemKnowledge`, so a real taxonomy can
//!   replace this without touching the strategist

use super::similarity::significant_words;

/// How large a share of the space a question type tends to cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Living,
    Edible,
    Property,
}

impl QuestionKind {
    pub fn elimination_fraction(&self) -> f32 {
        match self {
            QuestionKind::Living => 0.5,
            QuestionKind::Edible => 0.3,
            QuestionKind::Property => 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CannedQuestion {
    pub text: String,
    /// Property tag the question tests, when the catalog knows it
    pub tag: Option<String>,
    pub kind: QuestionKind,
}

pub trait ItemKnowledge: Send + Sync {
    fn categories(&self) -> Vec<String>;

    /// Canonical category name for a case-insensitive lookup.
    fn resolve_category(&self, name: &str) -> Option<String>;

    fn items(&self, category: &str) -> Vec<String>;

    /// `None` when the property is unknown for this category.
    fn has_property(&self, category: &str, item: &str, tag: &str) -> Option<bool>;

    /// Property tags a question refers to.
    fn mentioned_properties(&self, category: &str, question: &str) -> Vec<String>;

    /// Items a question names directly ("Is it a cat?").
    fn mentioned_items(&self, category: &str, question: &str) -> Vec<String>;

    fn candidate_questions(&self, category: &str) -> Vec<CannedQuestion>;
}

struct Property {
    tag: &'static str,
    aliases: &'static [&'static str],
    question: &'static str,
}

struct CategoryData {
    name: &'static str,
    properties: &'static [Property],
    items: &'static [(&'static str, &'static [&'static str])],
}

const fn prop(
    tag: &'static str,
    aliases: &'static [&'static str],
    question: &'static str,
) -> Property {
    Property {
        tag,
        aliases,
        question,
    }
}

static CATALOG: &[CategoryData] = &[
    CategoryData {
        name: "Animals",
        properties: &[
            prop("mammal", &["mammal"], "Is it a mammal?"),
            prop("pet", &["pet"], "Is it commonly kept as a pet?"),
            prop("wild", &["wild"], "Does it live in the wild?"),
            prop("carnivore", &["carnivore", "meat"], "Is it a carnivore?"),
            prop("fly", &["fly", "flie", "flying", "wing"], "Can it fly?"),
            prop("aquatic", &["aquatic", "water", "swim", "ocean", "sea"], "Does it live in water?"),
            prop("bird", &["bird"], "Is it a bird?"),
            prop("farm", &["farm"], "Is it found on a farm?"),
            prop("large", &["large", "big", "bigger", "human"], "Is it bigger than a human?"),
            prop("insect", &["insect", "bug"], "Is it an insect?"),
        ],
        items: &[
            ("Dog", &["mammal", "pet", "carnivore"]),
            ("Cat", &["mammal", "pet", "carnivore"]),
            ("Rabbit", &["mammal", "pet"]),
            ("Horse", &["mammal", "farm", "large"]),
            ("Cow", &["mammal", "farm", "large"]),
            ("Lion", &["mammal", "wild", "carnivore", "large"]),
            ("Elephant", &["mammal", "wild", "large"]),
            ("Dolphin", &["mammal", "wild", "aquatic", "carnivore", "large"]),
            ("Eagle", &["bird", "fly", "wild", "carnivore"]),
            ("Penguin", &["bird", "wild", "aquatic", "carnivore"]),
            ("Chicken", &["bird", "farm"]),
            ("Shark", &["wild", "aquatic", "carnivore", "large"]),
            ("Goldfish", &["pet", "aquatic"]),
            ("Snake", &["wild", "carnivore"]),
            ("Butterfly", &["insect", "fly", "wild"]),
            ("Bee", &["insect", "fly", "wild", "farm"]),
        ],
    },
    CategoryData {
        name: "Food",
        properties: &[
            prop("fruit", &["fruit"], "Is it a fruit?"),
            prop("vegetable", &["vegetable"], "Is it a vegetable?"),
            prop("sweet", &["sweet", "sugar"], "Is it sweet?"),
            prop("dessert", &["dessert"], "Is it usually eaten as a dessert?"),
            prop("baked", &["baked", "bake", "oven"], "Is it baked?"),
            prop("dairy", &["dairy", "milk", "cheese"], "Does it contain dairy?"),
            prop("meat", &["meat"], "Does it contain meat?"),
            prop("hot", &["hot", "warm", "cooked"], "Is it usually served hot?"),
            prop("snack", &["snack"], "Is it a snack?"),
            prop("grain", &["grain", "wheat", "flour"], "Is it made from grain?"),
        ],
        items: &[
            ("Apple", &["fruit", "sweet", "snack"]),
            ("Banana", &["fruit", "sweet", "snack"]),
            ("Carrot", &["vegetable", "snack"]),
            ("Broccoli", &["vegetable", "hot"]),
            ("Pizza", &["baked", "hot", "dairy", "grain"]),
            ("Bread", &["baked", "grain"]),
            ("Cheese", &["dairy", "snack"]),
            ("Ice Cream", &["dairy", "sweet", "dessert"]),
            ("Chocolate", &["sweet", "dessert", "snack"]),
            ("Steak", &["meat", "hot"]),
            ("Sushi", &["meat", "grain"]),
            ("Popcorn", &["snack", "grain", "hot"]),
            ("Cake", &["baked", "sweet", "dessert", "dairy", "grain"]),
            ("Rice", &["grain", "hot"]),
        ],
    },
    CategoryData {
        name: "Objects",
        properties: &[
            prop("electronic", &["electronic", "electricity", "battery", "plug"], "Does it use electricity?"),
            prop("furniture", &["furniture"], "Is it a piece of furniture?"),
            prop("kitchen", &["kitchen", "cooking"], "Is it found in a kitchen?"),
            prop("portable", &["portable", "carry", "hand", "pocket"], "Can you hold it in one hand?"),
            prop("metal", &["metal"], "Is it made of metal?"),
            prop("wood", &["wood", "wooden"], "Is it made of wood?"),
            prop("sharp", &["sharp", "cut"], "Is it sharp?"),
            prop("paper", &["paper"], "Is it made of paper?"),
            prop("writing", &["write", "writing"], "Is it used for writing?"),
        ],
        items: &[
            ("Smartphone", &["electronic", "portable"]),
            ("Laptop", &["electronic"]),
            ("Television", &["electronic"]),
            ("Chair", &["furniture", "wood"]),
            ("Table", &["furniture", "wood"]),
            ("Spoon", &["kitchen", "portable", "metal"]),
            ("Knife", &["kitchen", "portable", "metal", "sharp"]),
            ("Scissors", &["portable", "metal", "sharp"]),
            ("Book", &["portable", "paper"]),
            ("Pencil", &["portable", "wood", "writing"]),
            ("Refrigerator", &["electronic", "kitchen"]),
            ("Umbrella", &["portable"]),
            ("Lamp", &["electronic", "furniture"]),
        ],
    },
    CategoryData {
        name: "Vehicles",
        properties: &[
            prop("wheels", &["wheel"], "Does it have wheels?"),
            prop("engine", &["engine", "motor", "fuel"], "Does it have an engine?"),
            prop("fly", &["fly", "flie", "flying", "air"], "Can it fly?"),
            prop("water", &["water", "sea", "float", "boat"], "Does it travel on water?"),
            prop("public", &["public", "passenger", "transport"], "Is it a form of public transport?"),
            prop("rail", &["rail", "track"], "Does it run on rails?"),
            prop("pedal", &["pedal"], "Is it powered by pedaling?"),
        ],
        items: &[
            ("Car", &["wheels", "engine"]),
            ("Bicycle", &["wheels", "pedal"]),
            ("Motorcycle", &["wheels", "engine"]),
            ("Bus", &["wheels", "engine", "public"]),
            ("Train", &["wheels", "engine", "public", "rail"]),
            ("Airplane", &["wheels", "engine", "fly", "public"]),
            ("Helicopter", &["engine", "fly"]),
            ("Boat", &["water", "engine"]),
            ("Sailboat", &["water"]),
            ("Submarine", &["water", "engine"]),
            ("Skateboard", &["wheels"]),
            ("Tram", &["wheels", "public", "rail"]),
        ],
    },
    CategoryData {
        name: "Places",
        properties: &[
            prop("natural", &["natural", "nature"], "Is it a natural place?"),
            prop("city", &["city", "town"], "Is it a city?"),
            prop("building", &["building", "structure", "built"], "Is it a building or structure?"),
            prop("cold", &["cold", "snow", "ice", "freezing"], "Is it cold there?"),
            prop("hot", &["hot", "warm", "desert"], "Is it hot there?"),
            prop("europe", &["europe", "european"], "Is it in Europe?"),
            prop("asia", &["asia", "asian"], "Is it in Asia?"),
            prop("famous", &["famous", "landmark", "tourist"], "Is it a famous landmark?"),
        ],
        items: &[
            ("Paris", &["city", "europe", "famous"]),
            ("Tokyo", &["city", "asia", "famous"]),
            ("Sahara Desert", &["natural", "hot"]),
            ("Antarctica", &["natural", "cold"]),
            ("Mount Everest", &["natural", "cold", "asia", "famous"]),
            ("Amazon Rainforest", &["natural", "hot"]),
            ("Eiffel Tower", &["building", "europe", "famous"]),
            ("Great Wall of China", &["building", "asia", "famous"]),
            ("Library", &["building"]),
            ("Beach", &["natural", "hot"]),
            ("Hospital", &["building"]),
        ],
    },
];

/// Fallback questions usable in any category.
static GENERIC_QUESTIONS: &[(&str, QuestionKind)] = &[
    ("Is it alive?", QuestionKind::Living),
    ("Can you eat it?", QuestionKind::Edible),
    ("Is it bigger than a breadbox?", QuestionKind::Property),
    ("Is it made by humans?", QuestionKind::Property),
    ("Can you find it in a typical home?", QuestionKind::Property),
    ("Is it used every day?", QuestionKind::Property),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCatalog;

impl StaticCatalog {
    pub fn new() -> Self {
        Self
    }

    fn category(&self, name: &str) -> Option<&'static CategoryData> {
        CATALOG.iter().find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }
}

impl ItemKnowledge for StaticCatalog {
    fn categories(&self) -> Vec<String> {
        CATALOG.iter().map(|c| c.name.to_string()).collect()
    }

    fn resolve_category(&self, name: &str) -> Option<String> {
        self.category(name).map(|c| c.name.to_string())
    }

    fn items(&self, category: &str) -> Vec<String> {
        self.category(category)
            .map(|c| c.items.iter().map(|(name, _)| name.to_string()).collect())
            .unwrap_or_default()
    }

    fn has_property(&self, category: &str, item: &str, tag: &str) -> Option<bool> {
        let data = self.category(category)?;
        if !data.properties.iter().any(|p| p.tag == tag) {
            return None;
        }
        let (_, tags) = data.items.iter().find(|(name, _)| name.eq_ignore_ascii_case(item))?;
        Some(tags.contains(&tag))
    }

    fn mentioned_properties(&self, category: &str, question: &str) -> Vec<String> {
        let Some(data) = self.category(category) else {
            return Vec::new();
        };
        let words = significant_words(question);
        data.properties
            .iter()
            .filter(|p| p.aliases.iter().any(|a| words.contains(*a)))
            .map(|p| p.tag.to_string())
            .collect()
    }

    fn mentioned_items(&self, category: &str, question: &str) -> Vec<String> {
        let Some(data) = self.category(category) else {
            return Vec::new();
        };
        let text = format!(" {} ", super::similarity::normalize(question));
        data.items
            .iter()
            .filter(|(name, _)| text.contains(&format!(" {} ", name.to_lowercase())))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn candidate_questions(&self, category: &str) -> Vec<CannedQuestion> {
        let mut out: Vec<CannedQuestion> = self
            .category(category)
            .map(|data| {
                data.properties
                    .iter()
                    .map(|p| CannedQuestion {
                        text: p.question.to_string(),
                        tag: Some(p.tag.to_string()),
                        kind: QuestionKind::Property,
                    })
                    .collect()
            })
            .unwrap_or_default();

        out.extend(GENERIC_QUESTIONS.iter().map(|(text, kind)| CannedQuestion {
            text: text.to_string(),
            tag: None,
            kind: *kind,
        }));
        out
    }
}

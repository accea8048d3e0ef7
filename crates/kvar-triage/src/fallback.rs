//! Deterministic keyword classifier.
//!
//! Used when no external analyzer produced a usable result. Rules are
//! evaluated top to bottom on a folded copy of the text and the first match
//! wins, so the order below encodes domain priority: leaks and flooding come
//! before gas, and both come before ordinary electrical faults. Do not reorder
//! without a product decision.

use tracing::trace;

use kvar_core::defaults::{DEFAULT_RULE_CONFIDENCE, RULE_MATCH_CONFIDENCE};
use kvar_core::taxonomy::fold;
use kvar_core::{Category, ClassificationResult, Priority, Room};

/// One keyword rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    /// Folded word stems; a stem matches at the start of a word.
    pub keywords: &'static [&'static str],
    /// Folded keywords that only match as a whole word, for stems that also
    /// start unrelated everyday words.
    pub words: &'static [&'static str],
    pub category: Category,
    pub priority: Priority,
    pub room: Room,
    pub confidence: f64,
    pub estimated_cost: &'static str,
    pub estimated_time: &'static str,
    pub solution: &'static str,
}

/// Ordered rule table.
pub const RULES: &[Rule] = &[
    Rule {
        keywords: &[
            "voda", "vode", "vodu", "vodom", "curi", "curenje", "procur", "poplav", "leak",
            "water", "flood",
        ],
        words: &[],
        category: Category::Water,
        priority: Priority::Urgent,
        room: Room::Bathroom,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "50-300 EUR",
        estimated_time: "2-4 sata",
        solution: "Zatvoriti glavni ventil i pozvati vodoinstalatera.",
    },
    Rule {
        keywords: &[
            "plin", "pozar", "vatra", "gori", "dimi", "dima", "dimom", "gas", "fire", "smoke",
        ],
        words: &["dim"],
        category: Category::Security,
        priority: Priority::Urgent,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "ovisno o procjeni",
        estimated_time: "odmah",
        solution: "Napustiti prostor i nazvati 112 te dežurnu službu.",
    },
    Rule {
        keywords: &["dizal", "lift", "elevator"],
        words: &[],
        category: Category::Elevator,
        priority: Priority::High,
        room: Room::Stairwell,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "100-500 EUR",
        estimated_time: "1 dan",
        solution: "Isključiti dizalo iz uporabe i pozvati ovlašteni servis.",
    },
    Rule {
        keywords: &[
            "slavin", "odvod", "sudoper", "tus", "kadi", "kade", "kadom", "bojler", "cijev",
            "kanalizac", "zacepljen", "vodokotlic", "skoljk", "plumbing", "drain", "faucet",
        ],
        words: &["kadu"],
        category: Category::Water,
        priority: Priority::High,
        room: Room::Bathroom,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "30-200 EUR",
        estimated_time: "1-3 sata",
        solution: "Pozvati vodoinstalatera.",
    },
    Rule {
        keywords: &[
            "struj", "uticnic", "osigurac", "zarulj", "svjetl", "rasvjet", "prekidac", "kabel",
            "elektri", "iskri", "electric", "power", "outlet", "socket",
        ],
        words: &[],
        category: Category::Electrical,
        priority: Priority::High,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "40-250 EUR",
        estimated_time: "1-3 sata",
        solution: "Isključiti osigurač i pozvati električara.",
    },
    Rule {
        keywords: &[
            "grijanj", "radijator", "klima", "toplin", "hladno", "heating", "radiator", "boiler",
        ],
        words: &[],
        category: Category::Heating,
        priority: Priority::High,
        room: Room::LivingRoom,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "50-400 EUR",
        estimated_time: "2-6 sati",
        solution: "Pozvati servis za grijanje i klimatizaciju.",
    },
    Rule {
        keywords: &["brav", "kljuc", "interfon", "provala", "alarm", "lock", "intercom"],
        words: &[],
        category: Category::Security,
        priority: Priority::High,
        room: Room::Hallway,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "30-150 EUR",
        estimated_time: "1-2 sata",
        solution: "Pozvati bravara.",
    },
    Rule {
        keywords: &["vrata", "prozor", "rolet", "staklo", "door", "window"],
        words: &[],
        category: Category::Carpentry,
        priority: Priority::Medium,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "30-300 EUR",
        estimated_time: "2-4 sata",
        solution: "Pozvati stolara.",
    },
    Rule {
        keywords: &["krov", "crijep", "oluk", "prokisnjav", "roof", "gutter"],
        words: &[],
        category: Category::Roof,
        priority: Priority::High,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "200-1500 EUR",
        estimated_time: "1-3 dana",
        solution: "Pozvati krovopokrivača.",
    },
    Rule {
        keywords: &[
            "zid", "fasad", "zbuk", "plijesan", "vlag", "pukotin", "wall", "mold", "crack",
        ],
        words: &[],
        category: Category::Walls,
        priority: Priority::Medium,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "100-800 EUR",
        estimated_time: "1-2 dana",
        solution: "Pozvati zidara ili ličioca.",
    },
    Rule {
        keywords: &["parket", "plocic", "laminat", "podn", "floor", "tile"],
        words: &[],
        category: Category::Floors,
        priority: Priority::Medium,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "50-500 EUR",
        estimated_time: "1 dan",
        solution: "Pozvati parketara ili keramičara.",
    },
    Rule {
        keywords: &[
            "zohar", "misev", "stakor", "glodav", "buhe", "stenic", "smece", "smrad", "pests",
            "cockroach", "rats", "mice",
        ],
        words: &[],
        category: Category::Hygiene,
        priority: Priority::Medium,
        room: Room::Other,
        confidence: RULE_MATCH_CONFIDENCE,
        estimated_cost: "50-200 EUR",
        estimated_time: "1 dan",
        solution: "Organizirati deratizaciju ili dezinsekciju.",
    },
];

/// Room mentions, checked in order after a rule has matched.
const ROOM_MENTIONS: &[(&str, Room)] = &[
    ("kuhinj", Room::Kitchen),
    ("kitchen", Room::Kitchen),
    ("kupaon", Room::Bathroom),
    ("kupatil", Room::Bathroom),
    ("bathroom", Room::Bathroom),
    ("wc", Room::Toilet),
    ("zahod", Room::Toilet),
    ("toalet", Room::Toilet),
    ("dnevn", Room::LivingRoom),
    ("boravk", Room::LivingRoom),
    ("boravak", Room::LivingRoom),
    ("spavac", Room::Bedroom),
    ("spavaon", Room::Bedroom),
    ("bedroom", Room::Bedroom),
    ("hodnik", Room::Hallway),
    ("predsoblj", Room::Hallway),
    ("balkon", Room::Balcony),
    ("teras", Room::Balcony),
    ("podrum", Room::Basement),
    ("stubist", Room::Stairwell),
    ("stepenist", Room::Stairwell),
    ("garaz", Room::Garage),
];

/// Whether `stem` occurs in `folded` at the start of a word.
pub(crate) fn has_stem(folded: &str, stem: &str) -> bool {
    folded.match_indices(stem).any(|(idx, _)| {
        folded[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Whether `word` occurs in `folded` as a complete word.
pub(crate) fn has_word(folded: &str, word: &str) -> bool {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

/// First rule whose keyword set matches, with the matching keyword.
pub fn matching_rule(text: &str) -> Option<(&'static Rule, &'static str)> {
    let folded = fold(text);
    RULES.iter().find_map(|rule| {
        trace!(category = %rule.category, "Evaluating fallback rule");
        rule.keywords
            .iter()
            .find(|kw| has_stem(&folded, kw))
            .or_else(|| rule.words.iter().find(|w| has_word(&folded, w)))
            .map(|kw| (rule, *kw))
    })
}

/// First room explicitly mentioned in the text.
pub fn mentioned_room(text: &str) -> Option<Room> {
    let folded = fold(text);
    ROOM_MENTIONS
        .iter()
        .find(|(stem, _)| has_stem(&folded, stem))
        .map(|(_, room)| *room)
}

/// Classify free text. Total and deterministic.
pub fn classify(text: &str) -> ClassificationResult {
    match matching_rule(text) {
        Some((rule, keyword)) => ClassificationResult {
            category: rule.category,
            priority: rule.priority,
            confidence: rule.confidence,
            reasoning: format!(
                "Automatska klasifikacija prema ključnoj riječi \"{}\": {}.",
                keyword, rule.category
            ),
            room: mentioned_room(text).unwrap_or(rule.room),
            estimated_cost: Some(rule.estimated_cost.to_string()),
            estimated_time: Some(rule.estimated_time.to_string()),
            solution: Some(rule.solution.to_string()),
        },
        None => default_result(),
    }
}

/// Low-confidence catch-all.
pub fn default_result() -> ClassificationResult {
    ClassificationResult {
        category: Category::Other,
        priority: Priority::Medium,
        confidence: DEFAULT_RULE_CONFIDENCE,
        reasoning: "Nije prepoznata kategorija; potrebna ručna procjena.".to_string(),
        room: Room::Other,
        estimated_cost: None,
        estimated_time: None,
        solution: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_leak_is_urgent() {
        let result = classify("Curi voda ispod sudopera");
        assert_eq!(result.category, Category::Water);
        assert_eq!(result.priority, Priority::Urgent);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_water_outranks_electrical() {
        let result = classify("Voda curi po utičnici u hodniku");
        assert_eq!(result.category, Category::Water);
        assert_eq!(result.priority, Priority::Urgent);
    }

    #[test]
    fn test_electrical() {
        let result = classify("Ne radi utičnica");
        assert_eq!(result.category, Category::Electrical);
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.room, Room::Other);
    }

    #[test]
    fn test_gas_before_plumbing() {
        let result = classify("Osjeti se plin kod bojlera");
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.priority, Priority::Urgent);
    }

    #[test]
    fn test_room_mention_overrides_rule_room() {
        let result = classify("Pregorjela žarulja u kuhinji");
        assert_eq!(result.category, Category::Electrical);
        assert_eq!(result.room, Room::Kitchen);

        let result = classify("Curi voda");
        assert_eq!(result.room, Room::Bathroom);
    }

    #[test]
    fn test_stem_must_start_a_word() {
        // "odvoda" contains "voda" mid-word and must hit the plumbing rule, not the leak rule
        let result = classify("Začepljenje odvoda");
        assert_eq!(result.category, Category::Water);
        assert_eq!(result.priority, Priority::High);
        assert!(!has_stem("podrumski", "rum"));
        assert!(has_stem("u podrumu", "podrum"));
    }

    #[test]
    fn test_kada_as_when_does_not_mean_bathtub() {
        let result = classify("Kada upalim svjetlo u hodniku, iskri prekidač");
        assert_eq!(result.category, Category::Electrical);
        assert_eq!(result.room, Room::Hallway);

        let result = classify("Ne otječe voda iz kade");
        assert_eq!(result.category, Category::Water);
        let result = classify("Ispucao emajl na kadi");
        assert_eq!(result.category, Category::Water);
        assert_eq!(result.priority, Priority::High);
        assert_eq!(classify("Ne otječe iz kade").priority, Priority::High);
    }

    #[test]
    fn test_dim_only_as_a_whole_word() {
        let result = classify("Dimenzije prozora su krive");
        assert_eq!(result.category, Category::Carpentry);
        assert_eq!(result.priority, Priority::Medium);

        let result = classify("Iz utičnice izlazi dim");
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.priority, Priority::Urgent);
        assert_eq!(classify("Stubište je puno dima").priority, Priority::Urgent);
    }

    #[test]
    fn test_has_word_needs_word_boundaries() {
        assert!(has_word("izlazi dim.", "dim"));
        assert!(has_word("dim", "dim"));
        assert!(!has_word("dimenzije", "dim"));
        assert!(!has_word("podim", "dim"));
    }

    #[test]
    fn test_case_and_diacritics_folded() {
        assert_eq!(classify("ŽOHARI U KUHINJI").category, Category::Hygiene);
        assert_eq!(classify("zohari u kuhinji").category, Category::Hygiene);
    }

    #[test]
    fn test_default_catch_all() {
        let result = classify("Nešto nije u redu");
        assert_eq!(result, default_result());
        assert_eq!(result.category, Category::Other);
        assert_eq!(result.priority, Priority::Medium);
        assert_eq!(result.room, Room::Other);
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(classify(""), default_result());
    }

    #[test]
    fn test_deterministic() {
        let text = "Dizalo stoji između katova, netko je unutra";
        assert_eq!(classify(text), classify(text));
        assert_eq!(classify(text).category, Category::Elevator);
    }

    #[test]
    fn test_every_rule_is_reachable() {
        for rule in RULES {
            let (matched, keyword) = matching_rule(rule.keywords[0]).unwrap();
            assert_eq!(matched, rule, "keyword {} shadowed by an earlier rule", keyword);
        }
    }

    #[test]
    fn test_confidences_in_range() {
        for rule in RULES {
            assert!((0.0..=1.0).contains(&rule.confidence));
        }
    }
}

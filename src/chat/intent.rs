//! Intent classification.
//!
//! An utterance is matched against [`RULES`], an ordered list of keyword
//! patterns. The first rule that matches decides the intent, so overlapping
//! vocabularies ("mint status" also contains "mint") resolve by position in
//! the table and nothing else:
//!
//! | # | Intent              | Triggers                                                   |
//! |---|---------------------|------------------------------------------------------------|
//! | 1 | `Greeting`          | the whole utterance is hi / hello / hey / gm / yo / help   |
//! | 2 | `TopHolders`        | top holder(s), top N holders, who holds the most           |
//! | 3 | `MintStatus`        | mint status, minting status, mint phase, can i mint        |
//! | 4 | `MintValidate`      | mint                                                       |
//! | 5 | `RandomTokenLookup` | random medalist / token / id / nft                         |
//! | 6 | `TokenLookup`       | token id N, id N, #N, token number N, show me token        |
//! | 7 | `CollectionStats`   | collection stats, stats, total nfts, supply, how many      |
//! | 8 | `OwnerLookup`       | owned by, nfts for, wallet, my collection, my nfts, 0x…    |
//! | 9 | `Unknown`           | anything else                                              |
//!
//! Classification is pure: no I/O, no state, same input same output.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::ChatError;
use crate::utils::extract_address;

pub const MAX_TOP_HOLDERS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum Intent {
    CollectionStats,
    /// Decimal digits as typed; ids are uint256 on-chain.
    TokenLookup { token_id: Option<String> },
    RandomTokenLookup,
    OwnerLookup { address: Option<String> },
    TopHolders { count: u32 },
    MintStatus,
    MintValidate { address: Option<String> },
    Greeting,
    Unknown,
}

/// Rule identifiers, listed in priority order by [`RULES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Greeting,
    TopHolders,
    MintStatus,
    MintValidate,
    RandomTokenLookup,
    TokenLookup,
    CollectionStats,
    OwnerLookup,
}

pub struct Rule {
    pub kind: RuleKind,
    pattern: Regex,
}

impl Rule {
    fn new(kind: RuleKind, pattern: &str) -> Self {
        Self {
            kind,
            pattern: Regex::new(pattern).unwrap(),
        }
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.pattern.is_match(lowered)
    }
}

lazy_static! {
    /// Priority-ordered rule table. Patterns run against the lower-cased utterance.
    pub static ref RULES: Vec<Rule> = vec![
        Rule::new(
            RuleKind::Greeting,
            r"^\s*(hi|hello|hey|hiya|gm|yo|sup|help|start|what can you do)[\s!.?,]*$",
        ),
        Rule::new(
            RuleKind::TopHolders,
            r"\btop\s+((\d+|one|two|three)\s+)?holders?\b|\bwho holds the most\b|\bbiggest holders?\b",
        ),
        Rule::new(
            RuleKind::MintStatus,
            r"\bmint(ing)?\s+(status|phase)\b|\bcan i mint\b|\bis mint(ing)? (open|live|active)\b",
        ),
        Rule::new(RuleKind::MintValidate, r"\bmint\b"),
        Rule::new(
            RuleKind::RandomTokenLookup,
            r"\brandom\s+(medalists?|tokens?|ids?|nfts?|ones?)\b",
        ),
        Rule::new(
            RuleKind::TokenLookup,
            r"\btoken\s+(id|number)\b|\bid\s*#?\s*\d+|#\s*\d+|\bshow me (a |the )?token\b|\bdetails of token\b",
        ),
        Rule::new(
            RuleKind::CollectionStats,
            r"\bcollection stats?\b|\bstats\b|\btotal nfts\b|\bsupply\b|\bhow many\b",
        ),
        Rule::new(
            RuleKind::OwnerLookup,
            r"\bowned by\b|\bnfts for\b|\bwallet\b|\bmy collection\b|\bmy nfts\b|\bmy medals?\b|\bmy medalists\b",
        ),
    ];

    static ref TOKEN_ID: Regex =
        Regex::new(r"(?:\btoken\s+id|\btoken\s+number|\bid|#)\s*[:#]?\s*(\d+)").unwrap();
    static ref TOP_COUNT: Regex =
        Regex::new(r"\btop\s+(\d+|one|two|three)\s+holders?\b").unwrap();
}

/// Maps an utterance to exactly one intent.
///
/// Empty or whitespace-only input is rejected with [`ChatError::EmptyInput`]
/// before any rule is consulted.
pub fn classify(text: &str) -> Result<Intent, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyInput);
    }
    let lowered = text.to_lowercase();
    let rule = RULES.iter().find(|r| r.matches(&lowered)).map(|r| r.kind);

    let intent = match rule {
        Some(RuleKind::Greeting) => Intent::Greeting,
        Some(RuleKind::TopHolders) => Intent::TopHolders {
            count: extract_top_holders_count(&lowered),
        },
        Some(RuleKind::MintStatus) => Intent::MintStatus,
        Some(RuleKind::MintValidate) => Intent::MintValidate {
            address: extract_address(text),
        },
        Some(RuleKind::RandomTokenLookup) => Intent::RandomTokenLookup,
        Some(RuleKind::TokenLookup) => Intent::TokenLookup {
            token_id: extract_token_id(&lowered),
        },
        Some(RuleKind::CollectionStats) => Intent::CollectionStats,
        Some(RuleKind::OwnerLookup) => Intent::OwnerLookup {
            address: extract_address(text),
        },
        // A bare address is treated as "show me what this wallet holds".
        None => match extract_address(text) {
            Some(address) => Intent::OwnerLookup {
                address: Some(address),
            },
            None => Intent::Unknown,
        },
    };
    Ok(intent)
}

/// Number following "token id" / "token number" / "id" / "#", without leading zeros.
pub fn extract_token_id(lowered: &str) -> Option<String> {
    let digits = TOKEN_ID.captures(lowered)?.get(1)?.as_str();
    match digits.trim_start_matches('0') {
        "" => Some("0".to_string()),
        trimmed => Some(trimmed.to_string()),
    }
}

/// "top N holders" -> N clamped to `[1, 3]`; 1 when absent.
pub fn extract_top_holders_count(lowered: &str) -> u32 {
    let requested: i64 = match TOP_COUNT.captures(lowered).and_then(|c| c.get(1)) {
        Some(m) => match m.as_str() {
            "one" => 1,
            "two" => 2,
            "three" => 3,
            // Oversized numbers saturate to the cap.
            digits => digits.parse().unwrap_or(i64::MAX),
        },
        None => 1,
    };
    clamp_top_holders(requested)
}

pub fn clamp_top_holders(requested: i64) -> u32 {
    requested.clamp(1, MAX_TOP_HOLDERS as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xAbC0000000000000000000000000000000000123";

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(classify(""), Err(ChatError::EmptyInput));
        assert_eq!(classify("   \n\t"), Err(ChatError::EmptyInput));
    }

    #[test]
    fn test_priority_resolves_overlaps() {
        // "mint status" also contains "mint"
        assert_eq!(classify("What's the mint status?").unwrap(), Intent::MintStatus);
        assert_eq!(classify("Can I mint right now").unwrap(), Intent::MintStatus);
        // "top holders" also contains "holders" and "how many"
        assert_eq!(
            classify("how many do the top 2 holders have").unwrap(),
            Intent::TopHolders { count: 2 }
        );
        // "random token" also contains "token"
        assert_eq!(classify("show me a random token").unwrap(), Intent::RandomTokenLookup);
        // "mint" outranks the token id vocabulary
        assert_eq!(
            classify("mint token id 5").unwrap(),
            Intent::MintValidate { address: None }
        );
        // token lookup outranks collection stats
        assert_eq!(
            classify("stats for token id 9").unwrap(),
            Intent::TokenLookup { token_id: Some("9".into()) }
        );
        // stats outrank the ownership vocabulary
        assert_eq!(classify("wallet stats").unwrap(), Intent::CollectionStats);
    }

    #[test]
    fn test_greeting_only_when_whole_utterance() {
        assert_eq!(classify("Hello!").unwrap(), Intent::Greeting);
        assert_eq!(classify("  gm ").unwrap(), Intent::Greeting);
        assert_eq!(
            classify("hi, who is the top holder").unwrap(),
            Intent::TopHolders { count: 1 }
        );
    }

    #[test]
    fn test_token_id_extraction() {
        assert_eq!(
            classify("Show me token id 7").unwrap(),
            Intent::TokenLookup { token_id: Some("7".into()) }
        );
        assert_eq!(
            classify("details of token #42").unwrap(),
            Intent::TokenLookup { token_id: Some("42".into()) }
        );
        assert_eq!(
            classify("token number 3 please").unwrap(),
            Intent::TokenLookup { token_id: Some("3".into()) }
        );
        assert_eq!(
            classify("show me token").unwrap(),
            Intent::TokenLookup { token_id: None }
        );
        assert_eq!(
            classify("show me my new token id 1024").unwrap(),
            Intent::TokenLookup { token_id: Some("1024".into()) }
        );
        assert_eq!(
            classify("token #007").unwrap(),
            Intent::TokenLookup { token_id: Some("7".into()) }
        );
        // "valid" must not look like "id"
        assert_eq!(classify("is this valid").unwrap(), Intent::Unknown);
    }

    #[test]
    fn test_token_id_beyond_u64_is_kept() {
        assert_eq!(
            classify("show me token id 99999999999999999999999").unwrap(),
            Intent::TokenLookup {
                token_id: Some("99999999999999999999999".into())
            }
        );
    }

    #[test]
    fn test_top_holders_count_is_clamped() {
        assert_eq!(extract_top_holders_count("top 10 holders"), 3);
        assert_eq!(extract_top_holders_count("top 0 holders"), 1);
        assert_eq!(extract_top_holders_count("top three holders"), 3);
        assert_eq!(extract_top_holders_count("top holder"), 1);
        assert_eq!(extract_top_holders_count("top 99999999999999999999999 holders"), 3);
        assert_eq!(clamp_top_holders(-4), 1);
        assert_eq!(clamp_top_holders(2), 2);
    }

    #[test]
    fn test_address_extraction_keeps_case() {
        let intent = classify(&format!("Show me my collection for {}", ADDR)).unwrap();
        assert_eq!(
            intent,
            Intent::OwnerLookup {
                address: Some(ADDR.to_string())
            }
        );

        let intent = classify(&format!("Mint me a Medalist to {}", ADDR)).unwrap();
        assert_eq!(
            intent,
            Intent::MintValidate {
                address: Some(ADDR.to_string())
            }
        );
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            classify(ADDR).unwrap(),
            Intent::OwnerLookup {
                address: Some(ADDR.to_string())
            }
        );
        assert_eq!(classify("tell me a joke").unwrap(), Intent::Unknown);
        assert_eq!(
            classify("mint me a medalist").unwrap(),
            Intent::MintValidate { address: None }
        );
        assert_eq!(classify("Collection stats").unwrap(), Intent::CollectionStats);
        assert_eq!(
            classify("my nfts").unwrap(),
            Intent::OwnerLookup { address: None }
        );
    }

    #[test]
    fn test_rule_table_order_is_fixed() {
        let order: Vec<RuleKind> = RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            order,
            vec![
                RuleKind::Greeting,
                RuleKind::TopHolders,
                RuleKind::MintStatus,
                RuleKind::MintValidate,
                RuleKind::RandomTokenLookup,
                RuleKind::TokenLookup,
                RuleKind::CollectionStats,
                RuleKind::OwnerLookup,
            ]
        );
    }
}

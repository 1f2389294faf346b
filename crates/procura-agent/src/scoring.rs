//! Vendor quote scoring and shortlisting.

use futures::stream::{self, StreamExt, TryStreamExt};
use procura_ai::OutputSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::completion::{Completion, complete_as};
use crate::error::{Error, Result};
use crate::summary::FinalizedRequirement;

/// How many quotes are scored at once
const SCORING_CONCURRENCY: usize = 4;

/// A vendor's response to an RFQ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorQuote {
    pub quote_id: u64,
    pub vendor_name: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub items_covered: Option<String>,
    /// Questionnaire answers, free-form
    #[serde(default)]
    pub answers: serde_json::Value,
}

/// Model-assigned scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorScores {
    pub relevance_score: u8,
    pub profile_score: u8,
    pub final_score: u8,
}

/// A quote with its scores and shortlist flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuote {
    pub quote: VendorQuote,
    pub scores: Option<VendorScores>,
    #[serde(default)]
    pub shortlisted: bool,
}

impl ScoredQuote {
    pub fn final_score(&self) -> u8 {
        self.scores.map_or(0, |s| s.final_score)
    }
}

pub fn scores_schema() -> OutputSchema {
    let score = |description: &str| {
        json!({"type": "integer", "minimum": 0, "maximum": 100, "description": description})
    };
    OutputSchema::new(
        "vendor_scores",
        json!({
            "type": "object",
            "properties": {
                "relevance_score": score("How well the vendor's answers match the requirement"),
                "profile_score": score("The vendor's profile and perceived reliability from their answers"),
                "final_score": score("Weighted score combining relevance, profile and price")
            },
            "required": ["relevance_score", "profile_score", "final_score"]
        }),
    )
}

pub fn scoring_prompt(requirement: &FinalizedRequirement, quote: &VendorQuote) -> String {
    let amount = quote
        .amount
        .map(|a| format!("${:.2}", a))
        .unwrap_or_else(|| "not provided".to_string());
    let answers = if quote.answers.is_null() {
        "none".to_string()
    } else {
        serde_json::to_string_pretty(&quote.answers).unwrap_or_else(|_| quote.answers.to_string())
    };

    format!(
        "Original User Requirement: {}\n\
         Finalized Items: {}\n\
         Vendor's Quote Amount: {}\n\
         Items Covered by Vendor: {}\n\
         Vendor's Answers to Questionnaire: {}\n\
         Task: Provide a score for this vendor based on Relevance (0-100), Profile (0-100), \
         and a Final Score (0-100).",
        requirement.initial_query,
        requirement.finalized_items().join(", "),
        amount,
        quote.items_covered.as_deref().unwrap_or("not provided"),
        answers
    )
}

/// Score one quote against a finalized requirement
pub async fn score_quote(
    completion: &dyn Completion,
    requirement: &FinalizedRequirement,
    quote: &VendorQuote,
) -> Result<VendorScores> {
    tracing::debug!(vendor = %quote.vendor_name, quote_id = quote.quote_id, "scoring quote");
    complete_as(completion, &scoring_prompt(requirement, quote), &scores_schema()).await
}

/// Score every quote, a few at a time. Output keeps input order.
pub async fn score_quotes(
    completion: &dyn Completion,
    requirement: &FinalizedRequirement,
    quotes: Vec<VendorQuote>,
) -> Result<Vec<ScoredQuote>> {
    stream::iter(quotes)
        .map(|quote| async move {
            let scores = score_quote(completion, requirement, &quote).await?;
            Ok::<_, Error>(ScoredQuote {
                quote,
                scores: Some(scores),
                shortlisted: false,
            })
        })
        .buffered(SCORING_CONCURRENCY)
        .try_collect()
        .await
}

/// Sort by final score, highest first, and flag the top `top_n`.
/// Unscored quotes count as zero; ties keep their input order.
pub fn shortlist(mut quotes: Vec<ScoredQuote>, top_n: usize) -> Vec<ScoredQuote> {
    quotes.sort_by(|a, b| b.final_score().cmp(&a.final_score()));
    for (i, quote) in quotes.iter_mut().enumerate() {
        quote.shortlisted = i < top_n;
    }
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCompletion, json, text};

    fn requirement() -> FinalizedRequirement {
        FinalizedRequirement {
            initial_query: "50 ergonomic office chairs".into(),
            category: "Office Chair".into(),
            requirements: vec![
                ("quantity".into(), "50".into()),
                ("budget".into(), "under $200 each".into()),
            ],
            summary: String::new(),
        }
    }

    fn quote(id: u64, vendor: &str) -> VendorQuote {
        VendorQuote {
            quote_id: id,
            vendor_name: vendor.into(),
            amount: Some(9500.0),
            items_covered: Some("chairs, delivery".into()),
            answers: serde_json::json!({"warranty": "5 years"}),
        }
    }

    fn scored(id: u64, final_score: Option<u8>) -> ScoredQuote {
        ScoredQuote {
            quote: quote(id, "v"),
            scores: final_score.map(|f| VendorScores {
                relevance_score: f,
                profile_score: f,
                final_score: f,
            }),
            shortlisted: false,
        }
    }

    #[test]
    fn test_scoring_prompt() {
        let prompt = scoring_prompt(&requirement(), &quote(1, "Acme"));
        assert!(prompt.contains("Original User Requirement: 50 ergonomic office chairs"));
        assert!(prompt.contains("Finalized Items: Quantity: 50, Budget: under $200 each"));
        assert!(prompt.contains("Vendor's Quote Amount: $9500.00"));
        assert!(prompt.contains("Items Covered by Vendor: chairs, delivery"));
        assert!(prompt.contains("\"warranty\": \"5 years\""));
    }

    #[tokio::test]
    async fn test_score_quote() {
        let completion = ScriptedCompletion::new(vec![json(serde_json::json!({
            "relevance_score": 90, "profile_score": 70, "final_score": 82
        }))]);
        let scores = score_quote(completion.as_ref(), &requirement(), &quote(1, "Acme"))
            .await
            .unwrap();
        assert_eq!(
            scores,
            VendorScores {
                relevance_score: 90,
                profile_score: 70,
                final_score: 82
            }
        );
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let completion = ScriptedCompletion::new(vec![text(
            r#"{"relevance_score": 140, "profile_score": 70, "final_score": 82}"#,
        )]);
        let err = score_quote(completion.as_ref(), &requirement(), &quote(1, "Acme"))
            .await
            .unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[tokio::test]
    async fn test_score_quotes_keeps_order() {
        let completion = ScriptedCompletion::new(vec![
            json(serde_json::json!({"relevance_score": 50, "profile_score": 50, "final_score": 50})),
            json(serde_json::json!({"relevance_score": 80, "profile_score": 80, "final_score": 80})),
        ]);
        let scored = score_quotes(
            completion.as_ref(),
            &requirement(),
            vec![quote(1, "Acme"), quote(2, "Globex")],
        )
        .await
        .unwrap();

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].quote.vendor_name, "Acme");
        assert!(scored.iter().all(|q| q.scores.is_some()));
    }

    #[test]
    fn test_shortlist() {
        let quotes = vec![
            scored(1, Some(60)),
            scored(2, None),
            scored(3, Some(90)),
            scored(4, Some(60)),
        ];
        let ranked = shortlist(quotes, 2);

        let ids: Vec<u64> = ranked.iter().map(|q| q.quote.quote_id).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
        let flags: Vec<bool> = ranked.iter().map(|q| q.shortlisted).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }

    #[test]
    fn test_shortlist_more_than_available() {
        let ranked = shortlist(vec![scored(1, Some(10))], 3);
        assert!(ranked[0].shortlisted);
    }
}

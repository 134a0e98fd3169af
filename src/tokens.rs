//! Token Estimation
//!
//! Rough prompt size estimates computed locally, before a request is sent.
//! They will not match the tokenizer exactly; use the `usage` block of a
//! response for billing-grade numbers.

use serde::{Deserialize, Serialize};
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_script::{Script, UnicodeScript};

use crate::api::ChatCompletionRequest;

/// Allowance for the role marker of each message
const TOKENS_PER_MESSAGE: u32 = 2;

/// Estimated prompt tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub estimated_tokens: u32,
}

fn tenths_for(c: char) -> u64 {
    use GeneralCategory::*;

    if c.script() == Script::Han {
        return 6;
    }
    match get_general_category(c) {
        UppercaseLetter | LowercaseLetter | TitlecaseLetter | ModifierLetter | OtherLetter
        | DecimalNumber | LetterNumber | OtherNumber
        | ConnectorPunctuation | DashPunctuation | OpenPunctuation | ClosePunctuation
        | InitialPunctuation | FinalPunctuation | OtherPunctuation
        | MathSymbol | CurrencySymbol | ModifierSymbol | OtherSymbol => 3,
        _ => 0,
    }
}

/// Estimate the tokens in `text`.
///
/// Han characters count 0.6. Other letters, numbers, punctuation and symbols
/// count 0.3. Combining marks, format characters, separators and controls
/// count nothing. The sum is rounded half up, with a floor of 1.
pub fn estimate_token_count(text: &str) -> TokenEstimate {
    // tenths of a token
    let tenths: u64 = text.chars().map(tenths_for).sum();

    let rounded = u32::try_from((tenths + 5) / 10).unwrap_or(u32::MAX);
    TokenEstimate {
        estimated_tokens: rounded.max(1),
    }
}

/// Estimate the prompt tokens of a whole request: every message plus its
/// role allowance, and the declared tools.
pub fn estimate_request_tokens(request: &ChatCompletionRequest) -> TokenEstimate {
    let mut total: u32 = 0;

    for message in &request.messages {
        total = total
            .saturating_add(TOKENS_PER_MESSAGE)
            .saturating_add(estimate_token_count(&message.content).estimated_tokens);
    }

    for tool in request.tools.iter().flatten() {
        let function = &tool.function;
        total = total
            .saturating_add(estimate_token_count(&function.name).estimated_tokens)
            .saturating_add(estimate_token_count(&function.description).estimated_tokens);

        if let Some(parameters) = &function.parameters {
            total = total
                .saturating_add(estimate_token_count(&parameters.to_string()).estimated_tokens);
        }
    }

    TokenEstimate {
        estimated_tokens: total,
    }
}

//! # Position Resolution
//!
//! Providers that describe a bracket with position codes (`WR2-M3`, `LF`, `GF`, ...) leave the
//! round and position numbers implicit. [`resolve_positions`] recovers them from the order the
//! codes appear in.
//!
//! A position code has the shape `<RoundPrefix>[-M<n>]`. Prefixes starting with `W` and the
//! `GF` prefix are on the upper side, everything else is on the lower side.
use std::collections::HashMap;

use regex::Regex;

use crate::slot::Side;
use crate::{Error, Result};

/// A position code with its round and position numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub prefix: String,
    pub side: Side,
    pub round: u32,
    pub position: u32,
}

/// Splits a position code into its round prefix and match number token.
///
/// # Errors
///
/// Returns [`Error::InvalidPosition`] if the code has an empty round prefix.
pub fn split_code(code: &str) -> Result<(&str, Option<&str>)> {
    let (prefix, token) = match code.split_once('-') {
        Some((prefix, token)) => (prefix, Some(token)),
        None => (code, None),
    };

    if prefix.is_empty() {
        return Err(Error::InvalidPosition(code.to_owned()));
    }

    Ok((prefix, token))
}

/// Returns `true` for position values that are provider data-entry artifacts rather than real
/// slots.
///
/// # Examples
///
/// ```
/// # use bracket_sync_core::position::is_rogue_position;
/// assert!(is_rogue_position("zero"));
/// assert!(is_rogue_position("Position 4"));
/// assert!(is_rogue_position("NA-M1"));
/// assert!(!is_rogue_position("WR1-M1"));
/// ```
pub fn is_rogue_position(code: &str) -> bool {
    code == "zero" || code.starts_with("Position") || code.starts_with("NA")
}

/// Removes all items whose position code is a rogue value.
pub fn discard_rogue_positions<T, F>(items: &mut Vec<T>, code: F)
where
    F: Fn(&T) -> &str,
{
    items.retain(|item| {
        let code = code(item);

        if is_rogue_position(code) {
            log::debug!("Discarding rogue position \"{}\"", code);
            false
        } else {
            true
        }
    });
}

/// Rewrites brackets that encode single elimination rounds as bare `R<n>` and the semifinals as
/// `SF` instead of continuing the `WR<n>` sequence.
///
/// `R<n>` becomes `WR<n>` and every `SF` code becomes `WR<k+1>`, where `k` is the number of the
/// most recent `WR` prefix before it. The same prefix substitutions are applied to `markup` and
/// the rewritten markup is returned. Brackets without any `SF` code are left untouched.
pub fn correct_alt_single_elimination(codes: &mut [String], markup: &str) -> Result<String> {
    if !codes.iter().any(|code| code.starts_with("SF")) {
        return Ok(markup.to_owned());
    }

    log::debug!("Correcting alternate single elimination positions");

    let mut rewrites: Vec<(String, String)> = Vec::new();
    let mut winners_round: Option<u32> = None;

    for code in codes.iter_mut() {
        if is_bare_round(code) {
            let (prefix, _) = split_code(code)?;
            push_rewrite(&mut rewrites, prefix, &format!("W{}", prefix));

            code.insert(0, 'W');
        }

        if code.starts_with('W') {
            let (prefix, _) = split_code(code)?;
            winners_round = prefix.strip_prefix("WR").and_then(|n| n.parse().ok());
        }

        if code.starts_with("SF") {
            let round = match winners_round {
                Some(round) => round + 1,
                None => {
                    log::warn!("No winners round precedes \"{}\", leaving it as is", code);
                    continue;
                }
            };

            let (prefix, token) = split_code(code)?;
            let new_prefix = format!("WR{}", round);

            let new_code = match token {
                Some(token) => format!("{}-{}", new_prefix, token),
                // `SF1`, `SF2`: the number is the match within the round.
                None => match prefix.strip_prefix("SF").filter(|n| !n.is_empty()) {
                    Some(number) => format!("{}-M{}", new_prefix, number),
                    None => new_prefix.clone(),
                },
            };

            push_rewrite(&mut rewrites, prefix, &new_prefix);
            *code = new_code;
        }
    }

    let mut markup = markup.to_owned();
    for (old, new) in rewrites {
        let re = Regex::new(&format!(r"\b{}\b", regex::escape(&old)))?;
        markup = re.replace_all(&markup, new.as_str()).into_owned();
    }

    Ok(markup)
}

fn is_bare_round(code: &str) -> bool {
    let mut chars = code.chars();
    chars.next() == Some('R') && chars.next().map_or(false, |c| c.is_ascii_digit())
}

fn push_rewrite(rewrites: &mut Vec<(String, String)>, old: &str, new: &str) {
    if !rewrites.iter().any(|(prefix, _)| prefix == old) {
        rewrites.push((old.to_owned(), new.to_owned()));
    }
}

/// Resolves the round and position numbers of `codes`.
///
/// Round numbers are assigned per side in the order distinct prefixes first appear; the input
/// order already reflects bracket progression. The position is the 1-based index of the code's
/// match number among all codes sharing its prefix, in input order. The returned list has the
/// same order as `codes`.
///
/// Rogue positions must be removed by the caller beforehand, see [`discard_rogue_positions`].
///
/// # Errors
///
/// Returns [`Error::InvalidPosition`] if any code has an empty round prefix and
/// [`Error::DuplicatePosition`] if two codes are the same.
pub fn resolve_positions<S>(codes: &[S]) -> Result<Vec<ResolvedPosition>>
where
    S: AsRef<str>,
{
    struct Round<'a> {
        side: Side,
        number: u32,
        tokens: Vec<Option<&'a str>>,
    }

    let mut rounds: HashMap<&str, Round<'_>> = HashMap::new();
    let mut upper_rounds = 0;
    let mut lower_rounds = 0;

    for code in codes {
        let (prefix, token) = split_code(code.as_ref())?;

        let round = rounds.entry(prefix).or_insert_with(|| {
            let side = Side::from_round_prefix(prefix);
            let counter = match side {
                Side::Upper => &mut upper_rounds,
                Side::Lower => &mut lower_rounds,
            };
            *counter += 1;

            Round {
                side,
                number: *counter,
                tokens: Vec::new(),
            }
        });

        if round.tokens.contains(&token) {
            return Err(Error::DuplicatePosition(code.as_ref().to_owned()));
        }
        round.tokens.push(token);
    }

    let mut resolved = Vec::with_capacity(codes.len());
    for code in codes {
        let (prefix, token) = split_code(code.as_ref())?;
        let round = &rounds[prefix];

        let index = round
            .tokens
            .iter()
            .position(|t| *t == token)
            .ok_or_else(|| Error::InvalidPosition(code.as_ref().to_owned()))?;

        resolved.push(ResolvedPosition {
            prefix: prefix.to_owned(),
            side: round.side,
            round: round.number,
            position: index as u32 + 1,
        });
    }

    Ok(resolved)
}

//! # Round Labels
//!
//! Template brackets ship their round names inside an HTML template rather than on the matches.
//! The template went through three encodings over the years, described by [`TemplateFormat`].
//! All of them are reduced to the same output: one [`RoundLabel`] per slot position, where the
//! position is the 1-based index of the match in the bracket's flat position list.
//!
//! Placeholders for matches carry that index in a `data-position` attribute.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::position::split_code;
use crate::{Error, Result};

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());

/// The round name of the slot at a flat position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundLabel {
    pub position: usize,
    pub round_name: String,
}

/// The encoding of round names within a bracket template.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    /// Oldest encoding. A heading (`h1`-`h6`) precedes a contiguous run of placeholders and
    /// names all of them. Trailing single-match rounds sometimes put their heading after the
    /// placeholder instead.
    Headings,
    /// Each round is an element with the `bracket-round` class and a class naming the round
    /// prefix (`WR1`, `LF`, ...), containing a `.round-name` label.
    RoundClasses,
    /// Current encoding. The first placeholder of each round contains a `.round-label`; the
    /// placeholders following it inherit that label.
    InlineLabels,
}

impl TemplateFormat {
    /// Picks the template format from the year in the bracket `title`, falling back to
    /// `season_year`. Brackets with no known year use the current format.
    pub fn detect(title: &str, season_year: Option<u16>) -> Self {
        let year = YEAR
            .captures(title)
            .and_then(|captures| captures[1].parse::<u16>().ok())
            .or(season_year);

        match year {
            Some(year) if year <= 2021 => Self::Headings,
            Some(2022) => Self::RoundClasses,
            _ => Self::InlineLabels,
        }
    }

    /// Extracts the round labels of the bracket called `title`. `positions` is the flat list of
    /// position codes the placeholders index into.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyExtraction`] if no rounds can be derived from the template or if a
    /// position is left without a round name.
    pub fn extract_headings(
        self,
        title: &str,
        markup: &str,
        positions: &[String],
    ) -> Result<Vec<RoundLabel>> {
        log::debug!("Extracting round labels of \"{}\" as {:?}", title, self);

        let document = Html::parse_fragment(markup);

        let labels = match self {
            Self::Headings => extract_heading_runs(title, &document)?,
            Self::RoundClasses => extract_round_classes(title, &document, positions)?,
            Self::InlineLabels => extract_inline_labels(title, &document)?,
        };

        if labels.is_empty() {
            return Err(empty(title, "no rounds found in template"));
        }

        Ok(labels)
    }
}

fn empty(title: &str, reason: impl Into<String>) -> Error {
    Error::EmptyExtraction {
        bracket: title.to_owned(),
        reason: reason.into(),
    }
}

fn selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|err| Error::InvalidSelector(format!("{}: {:?}", selector, err)))
}

fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn placeholder_position(element: ElementRef<'_>) -> Result<usize> {
    let value = element.value().attr("data-position").unwrap_or_default();

    match value.trim().parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(Error::InvalidPosition(value.to_owned())),
    }
}

#[derive(Debug)]
struct Round {
    name: String,
    positions: Vec<usize>,
}

fn extract_heading_runs(title: &str, document: &Html) -> Result<Vec<RoundLabel>> {
    let selector = selector("h1, h2, h3, h4, h5, h6, [data-position]")?;

    let mut rounds: Vec<Round> = Vec::new();
    for element in document.select(&selector) {
        if is_heading(element) {
            rounds.push(Round {
                name: text(element),
                positions: Vec::new(),
            });

            continue;
        }

        let position = placeholder_position(element)?;
        match rounds.last_mut() {
            Some(round) => round.positions.push(position),
            None => {
                return Err(empty(
                    title,
                    format!("placeholder {} precedes every heading", position),
                ))
            }
        }
    }

    if rounds.last().map_or(false, |round| round.positions.is_empty()) {
        repair_trailing_rounds(title, &mut rounds)?;
    }

    Ok(rounds
        .into_iter()
        .flat_map(|round| {
            let name = round.name;
            round.positions.into_iter().map(move |position| RoundLabel {
                position,
                round_name: name.clone(),
            })
        })
        .collect())
}

fn is_heading(element: ElementRef<'_>) -> bool {
    matches!(element.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Moves placeholders from the tail of earlier rounds into rounds that ended up empty because
/// their heading came after their placeholder. Ownership shifts backwards one position at a time
/// until no round is empty.
fn repair_trailing_rounds(title: &str, rounds: &mut [Round]) -> Result<()> {
    log::debug!("Repairing trailing rounds of \"{}\"", title);

    while let Some(empty_index) = rounds.iter().rposition(|round| round.positions.is_empty()) {
        let donor = rounds[..empty_index]
            .iter()
            .rposition(|round| !round.positions.is_empty());

        let position = donor.and_then(|donor| rounds[donor].positions.pop());
        match position {
            Some(position) => rounds[empty_index].positions.insert(0, position),
            None => {
                return Err(empty(
                    title,
                    format!("round \"{}\" has no positions", rounds[empty_index].name),
                ))
            }
        }
    }

    Ok(())
}

fn extract_round_classes(
    title: &str,
    document: &Html,
    positions: &[String],
) -> Result<Vec<RoundLabel>> {
    let round_selector = selector(".bracket-round")?;
    let name_selector = selector(".round-name")?;

    let mut names: HashMap<&str, String> = HashMap::new();
    for element in document.select(&round_selector) {
        let name = match element.select(&name_selector).next() {
            Some(name) => text(name),
            None => continue,
        };

        for class in element.value().classes() {
            if class != "bracket-round" {
                names.entry(class).or_insert_with(|| name.clone());
            }
        }
    }

    if names.is_empty() {
        return Err(empty(title, "no labelled rounds found in template"));
    }

    let mut labels = Vec::with_capacity(positions.len());
    for (index, code) in positions.iter().enumerate() {
        let (prefix, _) = split_code(code)?;

        let name = names.get(prefix).or_else(|| match prefix {
            "GF" => names.get("Finals"),
            "Finals" => names.get("GF"),
            _ => None,
        });

        match name {
            Some(name) => labels.push(RoundLabel {
                position: index + 1,
                round_name: name.clone(),
            }),
            None => {
                return Err(empty(
                    title,
                    format!("no round label for position \"{}\"", code),
                ))
            }
        }
    }

    Ok(labels)
}

fn extract_inline_labels(title: &str, document: &Html) -> Result<Vec<RoundLabel>> {
    let slot_selector = selector("[data-position]")?;
    let label_selector = selector(".round-label")?;

    let mut current: Option<String> = None;
    let mut labels = Vec::new();

    for element in document.select(&slot_selector) {
        if let Some(label) = element.select(&label_selector).next() {
            let label = text(label);
            if !label.is_empty() {
                current = Some(label);
            }
        }

        let position = placeholder_position(element)?;
        match &current {
            Some(name) => labels.push(RoundLabel {
                position,
                round_name: name.clone(),
            }),
            None => {
                return Err(empty(
                    title,
                    format!("placeholder {} precedes every label", position),
                ))
            }
        }
    }

    Ok(labels)
}

//! Rich-text markup handling for affliction descriptions.
//!
//! Descriptions arrive as HTML sprinkled with host enrichers such as
//! `@UUID[...]{Label}`, `@Check[fortitude|dc:18]`, `@Damage[2d6[poison]]`
//! and inline rolls `[[/r 1d4 #rounds]]`. Everything here is locale-neutral.

use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::error!(pattern, error = %e, "Invalid markup pattern");
            None
        }
    })
    .as_ref()
}

fn uuid_link() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"@UUID\[([^\]]*)\](?:\{([^}]*)\})?")
}

fn check_link() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"@Check\[([^\]]*)\](?:\{([^}]*)\})?")
}

fn damage_link() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"@Damage\[((?:[^\[\]]|\[[^\[\]]*\])*)\](?:\{([^}]*)\})?")
}

fn inline_roll() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(
        &RE,
        r"\[\[/(?:b|g|s|p)?r(?:oll)?\s+((?:[^\[\]]|\[[^\[\]]*\])*?)\]\](?:\{([^}]*)\})?",
    )
}

fn typed_formula() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"\(?\s*([0-9dD+\s-]+?)\s*\)?\[([^\]]+)\]")
}

fn block_break() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(?i)<br\s*/?>|</p\s*>|</li\s*>|</h\d\s*>|<hr\s*/?>")
}

fn any_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"<[^>]*>")
}

fn data_dc_attr() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r#"data-dc\s*=\s*["']?(\d+)"#)
}

/// A parenthesized span, ASCII or full-width; group 1 is the inside.
pub(crate) fn parenthetical() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"[(（]([^()（）]*)[)）]")
}

fn replace_with<F>(regex: Option<&Regex>, text: &str, render: F) -> String
where
    F: Fn(&Captures) -> String,
{
    match regex {
        Some(regex) => regex.replace_all(text, |caps: &Captures| render(caps)).into_owned(),
        None => text.to_string(),
    }
}

fn label<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    caps.get(2).map(|m| m.as_str().trim()).filter(|l| !l.is_empty())
}

/// Damage pulled out of a `@Damage` enricher or a typed inline roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDamage {
    pub formula: String,
    /// Type tags in source order, e.g. `["persistent", "bleed"]`
    pub types: Vec<String>,
}

impl MarkupDamage {
    pub fn is_persistent(&self) -> bool {
        self.types.iter().any(|t| t == "persistent")
    }

    /// The damage type proper, skipping category tags.
    pub fn damage_type(&self) -> Option<&str> {
        self.types
            .iter()
            .map(String::as_str)
            .find(|t| !matches!(*t, "persistent" | "splash" | "precision"))
    }
}

fn parse_typed_formulas(inner: &str) -> Vec<MarkupDamage> {
    let Some(regex) = typed_formula() else {
        return Vec::new();
    };
    regex
        .captures_iter(inner)
        .filter_map(|caps| {
            let formula = normalize_formula(caps.get(1)?.as_str());
            if formula.is_empty() {
                return None;
            }
            let types = caps
                .get(2)?
                .as_str()
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            Some(MarkupDamage { formula, types })
        })
        .collect()
}

/// Render `2d6[poison]` style payloads as readable text ("2d6 poison").
fn render_typed(inner: &str) -> String {
    let parsed = parse_typed_formulas(inner);
    if parsed.is_empty() {
        return inner.trim().to_string();
    }
    parsed
        .iter()
        .map(|d| format!("{} {}", d.formula, d.types.join(" ")))
        .collect::<Vec<_>>()
        .join(" plus ")
}

fn render_roll(inner: &str) -> String {
    let (formula, flavor) = match inner.split_once('#') {
        Some((formula, flavor)) => (formula, Some(flavor.trim())),
        None => (inner, None),
    };
    let formula = if formula.contains('[') {
        render_typed(formula)
    } else {
        formula.trim().to_string()
    };
    match flavor.filter(|f| !f.is_empty()) {
        Some(flavor) => format!("{} {}", formula, flavor),
        None => formula,
    }
}

fn check_params(inner: &str) -> (Option<i32>, Option<String>) {
    let mut dc = None;
    let mut ability = None;
    for param in inner.split('|').map(str::trim) {
        match param.split_once(':') {
            Some(("dc", value)) => dc = value.trim().parse().ok(),
            Some(("type", value)) => ability = Some(value.trim().to_lowercase()),
            Some(_) => {}
            None if ability.is_none() && !param.is_empty() => {
                ability = Some(param.to_lowercase())
            }
            None => {}
        }
    }
    (dc, ability)
}

/// Turn rich text into plain prose.
///
/// Block ends become newlines, every line is trimmed and whitespace runs
/// collapse to single spaces. Enrichers are replaced by their label or a
/// readable rendering of their payload.
pub fn strip_markup(raw: &str) -> String {
    let text = replace_with(block_break(), raw, |_| "\n".to_string());
    let text = replace_with(uuid_link(), &text, |caps| match label(caps) {
        Some(label) => label.to_string(),
        None => caps
            .get(1)
            .and_then(|m| m.as_str().rsplit('.').next())
            .unwrap_or_default()
            .to_string(),
    });
    let text = replace_with(check_link(), &text, |caps| match label(caps) {
        Some(label) => label.to_string(),
        None => {
            let (dc, ability) = check_params(caps.get(1).map_or("", |m| m.as_str()));
            match (dc, ability) {
                (Some(dc), Some(ability)) => format!("DC {} {}", dc, ability),
                (Some(dc), None) => format!("DC {}", dc),
                (None, Some(ability)) => ability,
                (None, None) => String::new(),
            }
        }
    });
    let text = replace_with(damage_link(), &text, |caps| match label(caps) {
        Some(label) => label.to_string(),
        None => render_typed(caps.get(1).map_or("", |m| m.as_str())),
    });
    let text = replace_with(inline_roll(), &text, |caps| match label(caps) {
        Some(label) => label.to_string(),
        None => render_roll(caps.get(1).map_or("", |m| m.as_str())),
    });
    let text = replace_with(any_tag(), &text, |_| String::new());
    let text = decode_entities(&text);

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace('\u{a0}', " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Damage enrichers and typed inline rolls, in source order.
pub fn damage_rolls(raw: &str) -> Vec<MarkupDamage> {
    let mut found: Vec<(usize, MarkupDamage)> = Vec::new();
    if let Some(regex) = damage_link() {
        for caps in regex.captures_iter(raw) {
            let Some(inner) = caps.get(1) else { continue };
            found.extend(
                parse_typed_formulas(inner.as_str())
                    .into_iter()
                    .map(|d| (inner.start(), d)),
            );
        }
    }
    if let Some(regex) = inline_roll() {
        for caps in regex.captures_iter(raw) {
            let Some(inner) = caps.get(1) else { continue };
            let formula = inner.as_str().split('#').next().unwrap_or_default();
            found.extend(
                parse_typed_formulas(formula)
                    .into_iter()
                    .map(|d| (inner.start(), d)),
            );
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, d)| d).collect()
}

/// Untyped inline rolls carrying a flavor, e.g. `[[/r 1d4 #rounds]]`,
/// as `(formula, flavor)` pairs.
pub fn inline_roll_durations(raw: &str) -> Vec<(String, String)> {
    let Some(regex) = inline_roll() else {
        return Vec::new();
    };
    regex
        .captures_iter(raw)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            let (formula, flavor) = inner.split_once('#')?;
            if formula.contains('[') {
                return None;
            }
            let formula = normalize_formula(formula);
            let flavor = flavor.trim().to_string();
            (!formula.is_empty() && !flavor.is_empty()).then_some((formula, flavor))
        })
        .collect()
}

/// Labels of `@UUID` links, the form conditions are usually linked in.
pub fn link_labels(raw: &str) -> Vec<String> {
    let Some(regex) = uuid_link() else {
        return Vec::new();
    };
    regex
        .captures_iter(raw)
        .filter_map(|caps| match label(&caps) {
            Some(label) => Some(label.to_string()),
            None => caps
                .get(1)
                .and_then(|m| m.as_str().rsplit('.').next())
                .map(str::to_string),
        })
        .collect()
}

/// DC and save ability from the first `@Check` enricher.
pub fn check_dc(raw: &str) -> (Option<i32>, Option<String>) {
    check_link()
        .and_then(|regex| regex.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|inner| check_params(inner.as_str()))
        .unwrap_or((None, None))
}

/// DC from a `data-dc` attribute.
pub fn data_dc(raw: &str) -> Option<i32> {
    data_dc_attr()?
        .captures(raw)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Canonical formula form: no whitespace, lowercase dice marker.
pub fn normalize_formula(formula: &str) -> String {
    formula
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_enrichers() {
        let raw = "<p><strong>Stage 1</strong> @Damage[1d6[poison]] and @UUID[Compendium.pf2e.conditionitems.Item.Enfeebled]{Enfeebled 1} (1 round)</p><p>Next&nbsp;line</p>";
        assert_eq!(
            strip_markup(raw),
            "Stage 1 1d6 poison and Enfeebled 1 (1 round)\nNext line"
        );
    }

    #[test]
    fn unlabelled_links_use_the_last_path_segment() {
        assert_eq!(
            strip_markup("@UUID[Compendium.pf2e.conditionitems.Item.Sickened] 1"),
            "Sickened 1"
        );
    }

    #[test]
    fn checks_render_their_dc() {
        assert_eq!(strip_markup("Saving Throw @Check[fortitude|dc:18]"), "Saving Throw DC 18 fortitude");
        assert_eq!(strip_markup("@Check[type:will|dc:20]{DC 20 Will}"), "DC 20 Will");
        assert_eq!(check_dc("@Check[fortitude|dc:18]"), (Some(18), Some("fortitude".to_string())));
        assert_eq!(check_dc("no checks"), (None, None));
    }

    #[test]
    fn inline_rolls_render_formula_and_flavor() {
        assert_eq!(strip_markup("for [[/r 1d4 #rounds]]"), "for 1d4 rounds");
        assert_eq!(strip_markup("for [[/r 1d4 #rounds]]{1d4 rounds}"), "for 1d4 rounds");
        assert_eq!(
            inline_roll_durations("lasts [[/r 2d6 #hours]] and [[/r 1d6[fire]]]"),
            vec![("2d6".to_string(), "hours".to_string())]
        );
    }

    #[test]
    fn damage_rolls_keep_type_tags() {
        let rolls = damage_rolls("@Damage[(1d6+2)[persistent,bleed]] then [[/r 2d4[cold]]]");
        assert_eq!(rolls.len(), 2);
        assert_eq!(rolls[0].formula, "1d6+2");
        assert!(rolls[0].is_persistent());
        assert_eq!(rolls[0].damage_type(), Some("bleed"));
        assert_eq!(rolls[1].formula, "2d4");
        assert_eq!(rolls[1].damage_type(), Some("cold"));
    }

    #[test]
    fn data_attribute_dc() {
        assert_eq!(data_dc(r#"<span data-dc="21">save</span>"#), Some(21));
        assert_eq!(data_dc("nothing"), None);
    }

    #[test]
    fn entities_decode_ampersand_last() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
    }
}

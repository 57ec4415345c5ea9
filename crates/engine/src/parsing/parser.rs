//! Affliction text parser.
//!
//! Turns a rich-text affliction description (or structured item fields) into
//! an `AfflictionDefinition`. All language-specific knowledge comes from the
//! `LocaleGrammar` passed in.

use std::collections::HashSet;
use std::ops::Range;
use std::str::FromStr;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use afflictor_domain::{
    AfflictionDefinition, AfflictionType, ConditionEntry, DamageEntry, DurationValue,
    MultipleExposure, StageDefinition, WeaknessEntry,
};

use super::grammar::{first_group, GrammarError, LocaleGrammar};
use super::markup;

pub const DEFAULT_NAME: &str = "Unknown Affliction";
const PERSISTENT_DAMAGE_CONDITION: &str = "persistent-damage";
const KEY_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Affliction {name} has stages but no save DC")]
    MissingDc { name: String },
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Structured fields carried by the source item, when it has them.
///
/// When `stages` is present the text is not parsed at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredHints {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub affliction_type: Option<AfflictionType>,
    pub save_dc: Option<i32>,
    pub save_ability: Option<String>,
    pub level: Option<u32>,
    pub source_ref: Option<String>,
    pub is_virulent: Option<bool>,
    pub onset: Option<DurationValue>,
    pub max_duration: Option<DurationValue>,
    pub stages: Option<Vec<StageDefinition>>,
}

impl StructuredHints {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(AfflictionDefinition),
    /// No stages could be found; the source is not an affliction.
    Skip,
}

impl ParseOutcome {
    pub fn into_definition(self) -> Option<AfflictionDefinition> {
        match self {
            ParseOutcome::Parsed(definition) => Some(definition),
            ParseOutcome::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ParseOutcome::Skip)
    }
}

/// Override-catalog key: the source reference when there is one, otherwise
/// a hash of the whitespace-normalized, lowercased text.
pub fn definition_key(source_ref: Option<&str>, raw: &str) -> String {
    if let Some(source_ref) = source_ref.map(str::trim).filter(|s| !s.is_empty()) {
        return source_ref.to_string();
    }
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(KEY_LENGTH);
    key
}

pub fn parse(
    raw: &str,
    grammar: &LocaleGrammar,
    hints: Option<&StructuredHints>,
) -> Result<ParseOutcome, ParseError> {
    let defaults = StructuredHints::default();
    let hints = hints.unwrap_or(&defaults);

    if let Some(stages) = hints.stages.as_ref().filter(|stages| !stages.is_empty()) {
        return from_structured(raw, hints, stages).map(ParseOutcome::Parsed);
    }

    let plain = markup::strip_markup(raw);
    let stages = extract_stages(raw, &plain, grammar);
    if stages.is_empty() {
        tracing::debug!(locale = %grammar.locale(), "No affliction stages found, skipping");
        return Ok(ParseOutcome::Skip);
    }

    let name = hints.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string());
    let (check_dc, check_ability) = markup::check_dc(raw);
    let save_dc = hints
        .save_dc
        .or(check_dc)
        .or_else(|| markup::data_dc(raw))
        .or_else(|| capture_number(&grammar.dc, &plain));
    if save_dc.is_none() {
        tracing::warn!(affliction = %name, "No save DC found; affliction is unusable until one is supplied");
    }

    let save_ability = hints
        .save_ability
        .clone()
        .or_else(|| check_ability.filter(|a| is_save_ability(a)))
        .or_else(|| {
            grammar
                .save_ability
                .captures(&plain)
                .and_then(|caps| first_group(&caps).and_then(|w| grammar.save_ability_slug(w)))
                .map(str::to_string)
        });

    let mut definition = AfflictionDefinition::new(
        name,
        hints
            .affliction_type
            .unwrap_or_else(|| detect_type(&plain, grammar)),
    );
    if let Some(save_ability) = save_ability {
        definition.save_ability = save_ability;
    }
    definition.save_dc = save_dc;
    definition.level = hints.level;
    definition.onset = hints
        .onset
        .clone()
        .or_else(|| capture_duration(&grammar.onset, &plain, grammar));
    definition.max_duration = hints
        .max_duration
        .clone()
        .or_else(|| capture_duration(&grammar.max_duration, &plain, grammar));
    definition.is_virulent = hints
        .is_virulent
        .unwrap_or_else(|| grammar.virulent.is_match(&plain));
    definition.multiple_exposure = multiple_exposure(&plain, grammar);
    definition.stages = stages;
    definition.source_ref = hints.source_ref.clone();
    definition.definition_key = definition_key(hints.source_ref.as_deref(), raw);

    tracing::debug!(
        affliction = %definition.name,
        locale = %grammar.locale(),
        stages = definition.stages.len(),
        dc = ?definition.save_dc,
        "Parsed affliction"
    );
    Ok(ParseOutcome::Parsed(definition))
}

fn from_structured(
    raw: &str,
    hints: &StructuredHints,
    stages: &[StageDefinition],
) -> Result<AfflictionDefinition, ParseError> {
    let name = hints.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string());
    let save_dc = hints
        .save_dc
        .filter(|dc| *dc > 0)
        .ok_or_else(|| ParseError::MissingDc { name: name.clone() })?;

    let mut definition =
        AfflictionDefinition::new(name, hints.affliction_type.unwrap_or_default()).with_dc(save_dc);
    if let Some(save_ability) = &hints.save_ability {
        definition.save_ability = save_ability.clone();
    }
    definition.level = hints.level;
    definition.onset = hints.onset.clone();
    definition.max_duration = hints.max_duration.clone();
    definition.is_virulent = hints.is_virulent.unwrap_or(false);
    definition.stages = stages.to_vec();
    definition.stages.sort_by_key(|stage| stage.number);
    definition.source_ref = hints.source_ref.clone();
    definition.definition_key = definition_key(hints.source_ref.as_deref(), raw);
    Ok(definition)
}

fn is_save_ability(word: &str) -> bool {
    matches!(word, "fortitude" | "reflex" | "will")
}

fn detect_type(plain: &str, grammar: &LocaleGrammar) -> AfflictionType {
    fn priority(kind: &AfflictionType) -> u8 {
        match kind {
            AfflictionType::Disease => 0,
            AfflictionType::Curse => 1,
            AfflictionType::Poison => 2,
        }
    }
    grammar
        .affliction_type
        .captures_iter(plain)
        .filter_map(|caps| first_group(&caps).and_then(|w| grammar.affliction_type_for(w)))
        .min_by_key(priority)
        .unwrap_or_default()
}

fn capture_number<T: FromStr>(regex: &Regex, text: &str) -> Option<T> {
    regex
        .captures(text)
        .and_then(|caps| first_group(&caps).and_then(|n| n.parse().ok()))
}

fn duration_from(amount: &str, unit: &str, grammar: &LocaleGrammar) -> Option<DurationValue> {
    let unit = grammar.unit(unit)?;
    let amount = markup::normalize_formula(amount);
    if amount.contains('d') {
        Some(DurationValue::dice(amount, unit))
    } else {
        amount.parse().ok().map(|value| DurationValue::fixed(value, unit))
    }
}

/// Duration from a pattern whose groups 1 and 2 are amount and unit.
fn capture_duration(regex: &Regex, text: &str, grammar: &LocaleGrammar) -> Option<DurationValue> {
    let caps = regex.captures(text)?;
    duration_from(caps.get(1)?.as_str(), caps.get(2)?.as_str(), grammar)
}

fn paren_duration(plain: &str, grammar: &LocaleGrammar) -> Option<(DurationValue, Range<usize>)> {
    markup::parenthetical()?
        .captures_iter(plain)
        .find_map(|caps| {
            let inside = caps.get(1)?.as_str();
            let duration = capture_duration(&grammar.duration, inside, grammar)?;
            Some((duration, caps.get(0)?.range()))
        })
}

fn tidy(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ' ' | '.' | ',' | ';' | '。' | '，' | '；'))
        .to_string()
}

fn without_span(text: &str, span: Range<usize>) -> String {
    tidy(&format!("{} {}", &text[..span.start], &text[span.end..]))
}

// ---------------------------------------------------------------------------
// Stage extraction
// ---------------------------------------------------------------------------

struct Segment<'a> {
    number: u32,
    raw: &'a str,
}

fn extract_stages(raw: &str, plain: &str, grammar: &LocaleGrammar) -> Vec<StageDefinition> {
    // Headers the inline pattern rejects (no parenthesized duration) still
    // count; the paragraph reading fills them in behind the inline ones.
    let mut stages = inline_stages(raw, grammar);
    stages.extend(paragraph_stages(raw, grammar));
    if stages.is_empty() {
        stages = plain_stages(plain, grammar);
    }

    let mut numbers = HashSet::new();
    stages.retain(|stage| numbers.insert(stage.number));
    stages.sort_by_key(|stage| stage.number);
    resolve_references(&mut stages, grammar);
    stages
}

fn cut_at_paragraph_end(body: &str) -> &str {
    match body.to_ascii_lowercase().find("</p") {
        Some(end) => &body[..end],
        None => body,
    }
}

fn markup_segments<'a>(raw: &'a str, grammar: &LocaleGrammar) -> Vec<Segment<'a>> {
    let headers: Vec<(usize, usize, u32)> = grammar
        .stage_header_markup
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some((whole.start(), whole.end(), number))
        })
        .collect();

    headers
        .iter()
        .enumerate()
        .map(|(i, &(_, end, number))| {
            let next = headers.get(i + 1).map_or(raw.len(), |header| header.0);
            Segment {
                number,
                raw: cut_at_paragraph_end(&raw[end..next]),
            }
        })
        .collect()
}

/// `<strong>Stage N</strong> effects (duration) more effects`
fn inline_stages(raw: &str, grammar: &LocaleGrammar) -> Vec<StageDefinition> {
    markup_segments(raw, grammar)
        .into_iter()
        .filter_map(|segment| {
            let plain = markup::strip_markup(segment.raw);
            let (duration, span) = paren_duration(&plain, grammar)?;
            let effects = without_span(&plain, span);
            Some(build_stage(segment.number, &effects, segment.raw, &plain, Some(duration), grammar))
        })
        .collect()
}

/// A bold stage header followed by a paragraph; the duration, if any, comes
/// from an inline roll or a trailing "for X units" phrase.
fn paragraph_stages(raw: &str, grammar: &LocaleGrammar) -> Vec<StageDefinition> {
    markup_segments(raw, grammar)
        .into_iter()
        .map(|segment| {
            let plain = markup::strip_markup(segment.raw);
            let duration = markup::inline_roll_durations(segment.raw)
                .into_iter()
                .find_map(|(formula, flavor)| duration_from(&formula, &flavor, grammar))
                .or_else(|| capture_duration(&grammar.trailing_duration, &plain, grammar));
            build_stage(segment.number, &tidy(&plain), segment.raw, &plain, duration, grammar)
        })
        .collect()
}

fn overlaps(ranges: &[Range<usize>], start: usize, end: usize) -> bool {
    ranges.iter().any(|r| r.start < end && start < r.end)
}

/// Same shape as the inline strategy, on markup-free text.
fn plain_stages(plain: &str, grammar: &LocaleGrammar) -> Vec<StageDefinition> {
    // "as stage 1" and "stage 2 or higher" are not headers.
    let excluded: Vec<Range<usize>> = grammar
        .stage_reference
        .find_iter(plain)
        .chain(grammar.multiple_exposure_min_stage.find_iter(plain))
        .map(|m| m.range())
        .collect();

    let headers: Vec<(usize, usize, u32)> = grammar
        .stage_header_plain
        .captures_iter(plain)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some((whole.start(), whole.end(), number))
        })
        .filter(|&(start, end, _)| !overlaps(&excluded, start, end))
        .collect();

    headers
        .iter()
        .enumerate()
        .map(|(i, &(_, end, number))| {
            let next = headers.get(i + 1).map_or(plain.len(), |header| header.0);
            let mut body = &plain[end..next];
            if let Some(line_end) = body.find('\n') {
                body = &body[..line_end];
            }
            if let Some(label) = grammar.section_labels.find(body) {
                body = &body[..label.start()];
            }
            match paren_duration(body, grammar) {
                Some((duration, span)) => {
                    let effects = without_span(body, span);
                    build_stage(number, &effects, body, body, Some(duration), grammar)
                }
                None => {
                    let duration = capture_duration(&grammar.trailing_duration, body, grammar);
                    build_stage(number, &tidy(body), body, body, duration, grammar)
                }
            }
        })
        .collect()
}

fn resolve_references(stages: &mut [StageDefinition], grammar: &LocaleGrammar) {
    for i in 0..stages.len() {
        let Some(target) = capture_number::<u32>(&grammar.stage_reference, &stages[i].effects_text)
        else {
            continue;
        };
        if target == stages[i].number {
            continue;
        }
        if let Some(source) = stages.iter().find(|stage| stage.number == target).cloned() {
            stages[i].inherit_effects(&source);
        }
    }
}

// ---------------------------------------------------------------------------
// Stage effects
// ---------------------------------------------------------------------------

fn build_stage(
    number: u32,
    effects_text: &str,
    raw_segment: &str,
    plain_segment: &str,
    duration: Option<DurationValue>,
    grammar: &LocaleGrammar,
) -> StageDefinition {
    let mut stage = StageDefinition::new(number, effects_text);
    stage.duration = duration;

    let (damage, persistent) = extract_damage(raw_segment, plain_segment, grammar);
    stage.damage = damage;
    stage.conditions = extract_conditions(raw_segment, plain_segment, grammar);
    stage.conditions.extend(persistent);
    stage.weaknesses = extract_weaknesses(plain_segment, grammar);
    stage.requires_manual_handling = grammar.manual_handling.is_match(plain_segment);
    stage.is_lethal = grammar.death.is_match(plain_segment);
    stage
}

fn damage_type_or_word(grammar: &LocaleGrammar, word: &str) -> String {
    grammar
        .damage_type(word)
        .map(str::to_string)
        .unwrap_or_else(|| word.trim().to_lowercase())
}

fn persistent_condition(formula: String, damage_type: String) -> ConditionEntry {
    let mut condition = ConditionEntry::new(PERSISTENT_DAMAGE_CONDITION, None);
    condition.persistent_formula = Some(formula);
    condition.persistent_type = Some(damage_type);
    condition
}

/// Damage in three passes: locale choice phrases, markup rolls, then plain
/// "dice type damage". A pass skips formulas an earlier pass already took.
/// Persistent damage becomes a persistent-damage condition.
fn extract_damage(
    raw_segment: &str,
    plain: &str,
    grammar: &LocaleGrammar,
) -> (Vec<DamageEntry>, Vec<ConditionEntry>) {
    let mut taken: HashSet<String> = HashSet::new();
    let mut damage = Vec::new();
    let mut persistent = Vec::new();

    let mut pass: Vec<String> = Vec::new();
    for caps in grammar.damage_choice.captures_iter(plain) {
        let (Some(amount), Some(first), Some(second)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            continue;
        };
        let formula = markup::normalize_formula(amount.as_str());
        damage.push(DamageEntry::choice(
            formula.clone(),
            damage_type_or_word(grammar, first.as_str()),
            damage_type_or_word(grammar, second.as_str()),
        ));
        pass.push(formula);
    }
    taken.extend(pass.drain(..));

    for roll in markup::damage_rolls(raw_segment) {
        if taken.contains(&roll.formula) {
            continue;
        }
        let Some(damage_type) = roll.damage_type().map(|t| damage_type_or_word(grammar, t)) else {
            continue;
        };
        if roll.is_persistent() {
            persistent.push(persistent_condition(roll.formula.clone(), damage_type));
        } else {
            damage.push(DamageEntry::new(roll.formula.clone(), damage_type));
        }
        pass.push(roll.formula);
    }
    taken.extend(pass.drain(..));

    for caps in grammar.persistent_damage.captures_iter(plain) {
        let (Some(amount), Some(kind)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let formula = markup::normalize_formula(amount.as_str());
        if taken.contains(&formula) {
            continue;
        }
        persistent.push(persistent_condition(
            formula.clone(),
            damage_type_or_word(grammar, kind.as_str()),
        ));
        pass.push(formula);
    }
    taken.extend(pass.drain(..));

    for caps in grammar.damage_plain.captures_iter(plain) {
        let (Some(amount), Some(kind)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let formula = markup::normalize_formula(amount.as_str());
        if taken.contains(&formula) {
            continue;
        }
        damage.push(DamageEntry::new(formula, damage_type_or_word(grammar, kind.as_str())));
    }

    (damage, persistent)
}

/// Linked conditions first, then a plain scan for the ones not linked.
fn extract_conditions(raw_segment: &str, plain: &str, grammar: &LocaleGrammar) -> Vec<ConditionEntry> {
    let mut found: Vec<ConditionEntry> = Vec::new();

    for label in markup::link_labels(raw_segment) {
        let Some((slug, value)) = grammar.condition_for_label(&label) else {
            continue;
        };
        if found.iter().any(|c| c.name == slug) {
            continue;
        }
        // "@UUID[...]{Enfeebled} 2" keeps its value outside the label.
        let value = value.or_else(|| {
            grammar
                .conditions
                .iter()
                .filter(|matcher| matcher.slug == slug)
                .find_map(|matcher| capture_number(&matcher.pattern, plain))
        });
        found.push(ConditionEntry::new(slug, value));
    }

    for matcher in &grammar.conditions {
        if found.iter().any(|c| c.name == matcher.slug) {
            continue;
        }
        if let Some(caps) = matcher.pattern.captures(plain) {
            let value = caps.get(1).and_then(|m| m.as_str().parse().ok());
            found.push(ConditionEntry::new(matcher.slug, value));
        }
    }
    found
}

fn extract_weaknesses(plain: &str, grammar: &LocaleGrammar) -> Vec<WeaknessEntry> {
    let mut weaknesses: Vec<WeaknessEntry> = Vec::new();
    for rule in &grammar.weaknesses {
        for caps in rule.pattern.captures_iter(plain) {
            let (Some(kind), Some(value)) = (caps.get(rule.type_group), caps.get(rule.value_group))
            else {
                continue;
            };
            let Ok(value) = value.as_str().parse::<i32>() else {
                continue;
            };
            let weakness_type = damage_type_or_word(grammar, kind.as_str());
            if weaknesses.iter().any(|w| w.weakness_type == weakness_type) {
                continue;
            }
            weaknesses.push(WeaknessEntry {
                weakness_type,
                value,
            });
        }
    }
    weaknesses
}

fn multiple_exposure(plain: &str, grammar: &LocaleGrammar) -> Option<MultipleExposure> {
    let label = grammar.multiple_exposure_label.find(plain)?;
    let rest = &plain[label.start()..];
    let sentence = rest.split('\n').next().unwrap_or(rest);
    Some(MultipleExposure {
        enabled: true,
        stage_increase: capture_number(&grammar.multiple_exposure_increase, sentence).unwrap_or(1),
        min_stage: capture_number(&grammar.multiple_exposure_min_stage, sentence),
        raw_text: sentence.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Locale;
    use afflictor_domain::DurationUnit;

    const CENTIPEDE: &str = concat!(
        "<p><strong>Saving Throw</strong> @Check[fortitude|dc:18]; <strong>Onset</strong> 1 minute; ",
        "<strong>Maximum Duration</strong> 6 minutes</p>",
        "<p><strong>Stage 1</strong> 1d6 poison damage and ",
        "@UUID[Compendium.pf2e.conditionitems.Item.Enfeebled]{Enfeebled 1} (1 round)</p>",
        "<p><strong>Stage 2</strong> 2d6 poison damage and enfeebled 2 (1 round)</p>",
        "<p><strong>Stage 3</strong> 3d6 poison damage and ",
        "@UUID[Compendium.pf2e.conditionitems.Item.Paralyzed]{Paralyzed} (1d4 rounds)</p>",
    );

    fn english() -> &'static LocaleGrammar {
        Locale::English.grammar().unwrap()
    }

    fn parsed(raw: &str, grammar: &LocaleGrammar) -> AfflictionDefinition {
        parse(raw, grammar, None).unwrap().into_definition().unwrap()
    }

    #[test]
    fn parses_marked_up_english_poison() {
        let hints = StructuredHints::named("Giant Centipede Venom");
        let definition = parse(CENTIPEDE, english(), Some(&hints))
            .unwrap()
            .into_definition()
            .unwrap();

        assert_eq!(definition.name, "Giant Centipede Venom");
        assert_eq!(definition.affliction_type, AfflictionType::Poison);
        assert_eq!(definition.save_dc, Some(18));
        assert_eq!(definition.save_ability, "fortitude");
        assert_eq!(definition.onset, Some(DurationValue::fixed(1, DurationUnit::Minute)));
        assert_eq!(definition.max_duration, Some(DurationValue::fixed(6, DurationUnit::Minute)));
        assert_eq!(definition.stages.len(), 3);

        let first = &definition.stages[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.effects_text, "1d6 poison damage and Enfeebled 1");
        assert_eq!(first.duration, Some(DurationValue::fixed(1, DurationUnit::Round)));
        assert_eq!(first.damage, vec![DamageEntry::new("1d6", "poison")]);
        assert_eq!(first.conditions, vec![ConditionEntry::new("enfeebled", Some(1))]);

        assert_eq!(definition.stages[1].conditions, vec![ConditionEntry::new("enfeebled", Some(2))]);

        let third = &definition.stages[2];
        assert_eq!(third.duration, Some(DurationValue::dice("1d4", DurationUnit::Round)));
        assert_eq!(third.conditions, vec![ConditionEntry::new("paralyzed", None)]);
        assert!(!third.is_lethal);
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(
            parse(CENTIPEDE, english(), None).unwrap(),
            parse(CENTIPEDE, english(), None).unwrap()
        );
    }

    #[test]
    fn text_without_stages_is_skipped() {
        let outcome = parse("<p>A soothing tonic. DC 15</p>", english(), None).unwrap();
        assert!(outcome.is_skip());
    }

    #[test]
    fn plain_text_keeps_gaps_in_stage_numbers() {
        let raw = "Saving Throw DC 15 Fortitude. Stage 1 sickened 1 (1 round). Stage 3 sickened 2 (1 round).";
        let definition = parsed(raw, english());

        assert_eq!(definition.save_dc, Some(15));
        let numbers: Vec<u32> = definition.stages.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(definition.stages[0].effects_text, "sickened 1");
        assert_eq!(definition.stages[1].conditions, vec![ConditionEntry::new("sickened", Some(2))]);
        assert_eq!(definition.stage_count(), 3);
    }

    #[test]
    fn choice_damage_weakness_and_flags() {
        let raw = concat!(
            "<p><strong>Stage 1</strong> 2d6 cold or fire damage and weakness 5 to fire (1 round)</p>",
            "<p><strong>Stage 2</strong> the GM secretly decides; the creature dies (1 round)</p>",
        );
        let definition = parsed(raw, english());

        let first = &definition.stages[0];
        assert_eq!(first.damage, vec![DamageEntry::choice("2d6", "cold", "fire")]);
        assert_eq!(
            first.weaknesses,
            vec![WeaknessEntry {
                weakness_type: "fire".to_string(),
                value: 5
            }]
        );
        assert!(!first.requires_manual_handling);

        let second = &definition.stages[1];
        assert!(second.requires_manual_handling);
        assert!(second.is_lethal);
    }

    #[test]
    fn markup_damage_is_not_captured_twice() {
        let raw = "<p><strong>Stage 1</strong> @Damage[2d6[poison]] damage and @Damage[1d4[persistent,bleed]] (1 round)</p>";
        let stage = &parsed(raw, english()).stages[0];

        assert_eq!(stage.damage, vec![DamageEntry::new("2d6", "poison")]);
        assert_eq!(stage.conditions.len(), 1);
        assert_eq!(stage.conditions[0].name, "persistent-damage");
        assert_eq!(stage.conditions[0].persistent_formula.as_deref(), Some("1d4"));
        assert_eq!(stage.conditions[0].persistent_type.as_deref(), Some("bleed"));
    }

    #[test]
    fn stage_references_copy_effects() {
        let raw = concat!(
            "<p><strong>Stage 1</strong> 1d6 poison damage and drained 1 (1 day)</p>",
            "<p><strong>Stage 2</strong> as stage 1 (1 day)</p>",
        );
        let definition = parsed(raw, english());
        assert_eq!(definition.stages[1].damage, definition.stages[0].damage);
        assert_eq!(definition.stages[1].conditions, vec![ConditionEntry::new("drained", Some(1))]);
    }

    #[test]
    fn paragraph_stages_use_trailing_or_rolled_durations() {
        let raw = concat!(
            "<p><strong>Stage 1</strong> clumsy 1 for 2 hours</p>",
            "<p><strong>Stage 2</strong> clumsy 2 for [[/r 1d4 #days]]</p>",
        );
        let definition = parsed(raw, english());
        assert_eq!(
            definition.stages[0].duration,
            Some(DurationValue::fixed(2, DurationUnit::Hour))
        );
        assert_eq!(
            definition.stages[1].duration,
            Some(DurationValue::dice("1d4", DurationUnit::Day))
        );
        assert_eq!(definition.stages[0].effects_text, "clumsy 1 for 2 hours");
    }

    #[test]
    fn marked_up_stage_without_duration_is_kept() {
        let raw = concat!(
            "<p>Saving Throw DC 22 Fortitude</p>",
            "<p><strong>Stage 1</strong> 2d6 poison damage and drained 1 (1 round)</p>",
            "<p><strong>Stage 2</strong> 3d6 poison damage and drained 2 (1 round)</p>",
            "<p><strong>Stage 3</strong> death</p>",
        );
        let definition = parsed(raw, english());
        let numbers: Vec<(u32, bool)> = definition
            .stages
            .iter()
            .map(|stage| (stage.number, stage.is_lethal))
            .collect();
        assert_eq!(numbers, vec![(1, false), (2, false), (3, true)]);
        assert_eq!(definition.stage_count(), 3);
        assert_eq!(
            definition.stages[0].duration,
            Some(DurationValue::fixed(1, DurationUnit::Round))
        );
        assert_eq!(definition.stages[2].duration, None);
    }

    #[test]
    fn module_level_rules() {
        let raw = concat!(
            "<p>This virulent disease spreads quickly. Saving Throw DC 20 Fortitude</p>",
            "<p><strong>Stage 1</strong> fatigued (1 day)</p>",
            "<p><strong>Stage 2</strong> drained 1 (1 day)</p>",
            "<p>Multiple Exposures Each additional exposure increases the stage by 1, ",
            "but only if already at stage 2 or higher.</p>",
        );
        let definition = parsed(raw, english());

        assert_eq!(definition.affliction_type, AfflictionType::Disease);
        assert!(definition.is_virulent);
        assert_eq!(definition.save_dc, Some(20));
        let rule = definition.multiple_exposure.unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.stage_increase, 1);
        assert_eq!(rule.min_stage, Some(2));
        assert!(rule.raw_text.starts_with("Multiple Exposures"));
    }

    #[test]
    fn missing_dc_leaves_definition_unusable() {
        let definition = parsed("<p><strong>Stage 1</strong> sickened 1 (1 round)</p>", english());
        assert_eq!(definition.save_dc, None);
        assert!(!definition.is_usable());
    }

    #[test]
    fn parses_chinese_poison() {
        let raw = concat!(
            "<p><strong>豁免检定</strong> DC 19 强韧豁免；<strong>潜伏期</strong> 1分钟；",
            "<strong>最长持续时间</strong> 6轮</p>",
            "<p><strong>阶段1</strong> 1d6点毒素伤害并虚弱1（1轮）</p>",
            "<p><strong>阶段2</strong> 2d6点毒素伤害并虚弱2（1轮）</p>",
        );
        let definition = parsed(raw, Locale::Chinese.grammar().unwrap());

        assert_eq!(definition.save_dc, Some(19));
        assert_eq!(definition.save_ability, "fortitude");
        assert_eq!(definition.onset, Some(DurationValue::fixed(1, DurationUnit::Minute)));
        assert_eq!(definition.max_duration, Some(DurationValue::fixed(6, DurationUnit::Round)));
        assert_eq!(definition.stages.len(), 2);

        let first = &definition.stages[0];
        assert_eq!(first.effects_text, "1d6点毒素伤害并虚弱1");
        assert_eq!(first.duration, Some(DurationValue::fixed(1, DurationUnit::Round)));
        assert_eq!(first.damage, vec![DamageEntry::new("1d6", "poison")]);
        assert_eq!(first.conditions, vec![ConditionEntry::new("enfeebled", Some(1))]);
    }

    #[test]
    fn chinese_plain_text_skips_stage_references() {
        let raw = "阶段1 虚弱1（1天）阶段2 如阶段1（1天）";
        let definition = parsed(raw, Locale::Chinese.grammar().unwrap());
        let numbers: Vec<u32> = definition.stages.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(definition.stages[1].conditions, vec![ConditionEntry::new("enfeebled", Some(1))]);
    }

    #[test]
    fn structured_hints_bypass_text() {
        let hints = StructuredHints {
            name: Some("Arsenic".to_string()),
            save_dc: Some(18),
            stages: Some(vec![
                StageDefinition::new(2, "sickened 2"),
                StageDefinition::new(1, "sickened 1"),
            ]),
            ..StructuredHints::default()
        };
        let definition = parse("ignored", english(), Some(&hints))
            .unwrap()
            .into_definition()
            .unwrap();
        assert_eq!(definition.save_dc, Some(18));
        assert_eq!(definition.stages[0].number, 1);
        assert_eq!(definition.stages[1].number, 2);
    }

    #[test]
    fn structured_hints_without_dc_fail() {
        let hints = StructuredHints {
            name: Some("Arsenic".to_string()),
            stages: Some(vec![StageDefinition::new(1, "sickened 1")]),
            ..StructuredHints::default()
        };
        let err = parse("ignored", english(), Some(&hints)).unwrap_err();
        assert_eq!(err, ParseError::MissingDc { name: "Arsenic".to_string() });
    }

    #[test]
    fn definition_keys() {
        assert_eq!(definition_key(Some("Item.abc"), "whatever"), "Item.abc");
        let key = definition_key(None, "Stage 1  Sickened");
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, definition_key(Some("  "), "stage 1 sickened"));
        assert_ne!(key, definition_key(None, "stage 2 sickened"));
    }
}

//! English grammar.

use afflictor_domain::{AfflictionType, DurationUnit};

use super::grammar::{GrammarTables, Locale, WeaknessRule};

pub static TABLES: GrammarTables = GrammarTables {
    locale: Locale::English,
    case_insensitive: true,
    stage_header_markup: r"<(?:strong|b)>\s*Stage\s*(\d+)\s*:?\s*</(?:strong|b)>",
    stage_header_plain: r"\bStage\s*(\d+)\b\s*:?",
    onset: r"\bOnset\b\s*:?\s*{amount}\s*{unit}\b",
    max_duration: r"\bMaximum\s+Duration\b\s*:?\s*{amount}\s*{unit}\b",
    duration: r"^\s*{amount}\s*{unit}\s*$",
    trailing_duration: r"\bfor\s+{amount}\s*{unit}\b",
    dc: r"\bDC\s*:?\s*(\d+)",
    save_ability: r"\b(fortitude|reflex|will)\s+(?:save|saving\s+throw|DC)\b|\bDC\s*\d+\s+(?:basic\s+)?(fortitude|reflex|will)\b|\bbasic\s+(fortitude|reflex|will)\b",
    save_abilities: &[
        ("fortitude", "fortitude"),
        ("reflex", "reflex"),
        ("will", "will"),
    ],
    damage_choice: r"{amount}\s+{dtype}\s+or\s+{dtype}\s+damage\b",
    damage_plain: r"{amount}\s+{dtype}\s+damage\b",
    persistent_damage: r"{amount}\s+persistent\s+{dtype}\s+damage\b",
    damage_types: &[
        ("acid", "acid"),
        ("bleed", "bleed"),
        ("bludgeoning", "bludgeoning"),
        ("cold", "cold"),
        ("electricity", "electricity"),
        ("fire", "fire"),
        ("force", "force"),
        ("mental", "mental"),
        ("negative", "negative"),
        ("piercing", "piercing"),
        ("poison", "poison"),
        ("positive", "positive"),
        ("slashing", "slashing"),
        ("sonic", "sonic"),
        ("spirit", "spirit"),
        ("vitality", "vitality"),
        ("void", "void"),
    ],
    condition_template: r"\b{name}\b(?:\s+(\d+))?",
    conditions: &[
        ("blinded", "blinded"),
        ("clumsy", "clumsy"),
        ("confused", "confused"),
        ("controlled", "controlled"),
        ("dazzled", "dazzled"),
        ("deafened", "deafened"),
        ("doomed", "doomed"),
        ("drained", "drained"),
        ("enfeebled", "enfeebled"),
        ("fascinated", "fascinated"),
        ("fatigued", "fatigued"),
        ("flat-footed", "off-guard"),
        ("off-guard", "off-guard"),
        ("frightened", "frightened"),
        ("immobilized", "immobilized"),
        ("paralyzed", "paralyzed"),
        ("petrified", "petrified"),
        ("restrained", "restrained"),
        ("sickened", "sickened"),
        ("slowed", "slowed"),
        ("stunned", "stunned"),
        ("stupefied", "stupefied"),
        ("unconscious", "unconscious"),
        ("wounded", "wounded"),
    ],
    weaknesses: &[
        WeaknessRule {
            pattern: r"\bweakness\s+(\d+)\s+to\s+{dtype}\b",
            type_group: 2,
            value_group: 1,
        },
        WeaknessRule {
            pattern: r"\bweakness\s+to\s+{dtype}\s+(\d+)",
            type_group: 1,
            value_group: 2,
        },
        WeaknessRule {
            pattern: r"\b{dtype}\s+weakness\s+(\d+)",
            type_group: 1,
            value_group: 2,
        },
    ],
    manual_handling: r"\b(?:secret(?:ly)?|GM|game\s+master|chooses?|permanent(?:ly)?)\b",
    death: r"\b(?:dead|dies|die|death)\b",
    stage_reference: r"\bas\s+(?:in\s+)?stage\s*(\d+)\b",
    multiple_exposure_label: r"\bMultiple\s+Exposures?\b",
    multiple_exposure_increase: r"\b(?:increases?|raises?|advances?)\s+(?:the\s+|its\s+|your\s+)?stage\s+by\s+(\d+)|\bby\s+(\d+)\s+stages?\b",
    multiple_exposure_min_stage: r"\bstage\s*(\d+)\s+or\s+(?:higher|more|worse)\b",
    section_labels: r"\b(?:Onset|Maximum\s+Duration|Multiple\s+Exposures?|Saving\s+Throw)\b",
    virulent: r"\bvirulent\b",
    affliction_type: r"\b{atype}\b",
    affliction_types: &[
        ("disease", AfflictionType::Disease),
        ("curse", AfflictionType::Curse),
        ("poison", AfflictionType::Poison),
    ],
    unit_words: &[
        ("round", DurationUnit::Round),
        ("rounds", DurationUnit::Round),
        ("minute", DurationUnit::Minute),
        ("minutes", DurationUnit::Minute),
        ("hour", DurationUnit::Hour),
        ("hours", DurationUnit::Hour),
        ("day", DurationUnit::Day),
        ("days", DurationUnit::Day),
        ("week", DurationUnit::Week),
        ("weeks", DurationUnit::Week),
    ],
};

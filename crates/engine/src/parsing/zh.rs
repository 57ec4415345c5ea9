//! Simplified Chinese grammar.
//!
//! Chinese has no word boundaries, so patterns match literal terms and allow
//! both full-width and ASCII punctuation.

use afflictor_domain::{AfflictionType, DurationUnit};

use super::grammar::{GrammarTables, Locale, WeaknessRule};

pub static TABLES: GrammarTables = GrammarTables {
    locale: Locale::Chinese,
    case_insensitive: true,
    stage_header_markup: r"<(?:strong|b)>\s*阶段\s*(\d+)\s*[:：]?\s*</(?:strong|b)>",
    stage_header_plain: r"阶段\s*(\d+)\s*[:：]?",
    onset: r"潜伏期\s*[:：]?\s*{amount}\s*{unit}",
    max_duration: r"最长持续时间\s*[:：]?\s*{amount}\s*{unit}",
    duration: r"^\s*{amount}\s*个?\s*{unit}\s*$",
    trailing_duration: r"持续\s*{amount}\s*个?\s*{unit}",
    dc: r"DC\s*[:：]?\s*(\d+)",
    save_ability: r"(强韧|反射|意志)\s*(?:豁免|检定)|DC\s*\d+\s*的?\s*(?:基本)?(强韧|反射|意志)",
    save_abilities: &[
        ("强韧", "fortitude"),
        ("反射", "reflex"),
        ("意志", "will"),
    ],
    damage_choice: r"{amount}\s*点?\s*{dtype}\s*或\s*{dtype}\s*伤害",
    damage_plain: r"{amount}\s*点?\s*{dtype}\s*伤害",
    persistent_damage: r"{amount}\s*点?\s*持续\s*{dtype}\s*伤害",
    damage_types: &[
        ("强酸", "acid"),
        ("酸蚀", "acid"),
        ("流血", "bleed"),
        ("钝击", "bludgeoning"),
        ("寒冷", "cold"),
        ("电击", "electricity"),
        ("火焰", "fire"),
        ("力场", "force"),
        ("精神", "mental"),
        ("负能", "negative"),
        ("穿刺", "piercing"),
        ("毒素", "poison"),
        ("正能", "positive"),
        ("挥砍", "slashing"),
        ("音波", "sonic"),
        ("灵体", "spirit"),
        ("活力", "vitality"),
        ("虚空", "void"),
    ],
    condition_template: r"{name}\s*(\d+)?",
    conditions: &[
        ("目盲", "blinded"),
        ("笨拙", "clumsy"),
        ("困惑", "confused"),
        ("目眩", "dazzled"),
        ("耳聋", "deafened"),
        ("毁灭", "doomed"),
        ("耗竭", "drained"),
        ("虚弱", "enfeebled"),
        ("着迷", "fascinated"),
        ("疲乏", "fatigued"),
        ("措手不及", "off-guard"),
        ("恐惧", "frightened"),
        ("定身", "immobilized"),
        ("麻痹", "paralyzed"),
        ("石化", "petrified"),
        ("束缚", "restrained"),
        ("恶心", "sickened"),
        ("缓慢", "slowed"),
        ("震慑", "stunned"),
        ("呆滞", "stupefied"),
        ("昏迷", "unconscious"),
        ("受伤", "wounded"),
    ],
    weaknesses: &[
        WeaknessRule {
            pattern: r"{dtype}\s*弱点\s*(\d+)",
            type_group: 1,
            value_group: 2,
        },
        WeaknessRule {
            pattern: r"对\s*{dtype}\s*的弱点\s*(\d+)",
            type_group: 1,
            value_group: 2,
        },
    ],
    manual_handling: r"秘密|GM|选择|永久",
    death: r"死亡|死去",
    stage_reference: r"(?:如|同)同?\s*阶段\s*(\d+)",
    multiple_exposure_label: r"多次暴露",
    multiple_exposure_increase: r"阶段\s*(?:提高|增加|上升|提升)\s*(\d+)",
    multiple_exposure_min_stage: r"阶段\s*(\d+)\s*(?:或更高|以上)",
    section_labels: r"潜伏期|最长持续时间|多次暴露|豁免检定",
    virulent: r"烈性",
    affliction_type: r"{atype}",
    affliction_types: &[
        ("疾病", AfflictionType::Disease),
        ("诅咒", AfflictionType::Curse),
        ("毒药", AfflictionType::Poison),
    ],
    unit_words: &[
        ("轮", DurationUnit::Round),
        ("分钟", DurationUnit::Minute),
        ("小时", DurationUnit::Hour),
        ("天", DurationUnit::Day),
        ("日", DurationUnit::Day),
        ("周", DurationUnit::Week),
        ("星期", DurationUnit::Week),
    ],
};

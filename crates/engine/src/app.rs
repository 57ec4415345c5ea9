//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::{ManualTableClock, SystemClock, SystemRandom},
    dice::RandomDice,
    effects::RecordingEffects,
    notifier::RecordingNotifier,
    ports::{
        AfflictionStore, ClockPort, ConfirmationStore, DefinitionCatalog, DicePort, EffectPort,
        NotificationPort, RandomPort, RollLookup, TableClockPort,
    },
    settings::EngineSettings,
};
use crate::stores::{
    InMemoryAfflictionStore, InMemoryConfirmationStore, InMemoryDefinitionCatalog, RollLog,
};
use crate::use_cases::affliction::{
    self as affliction, AfflictionUseCases, ApplyExposure, HandleInitialSave, HandleStageSave,
    PreviewSave, Progression,
};

/// Host-side collaborators the engine runs against.
#[derive(Clone)]
pub struct HostPorts {
    pub store: Arc<dyn AfflictionStore>,
    pub catalog: Arc<dyn DefinitionCatalog>,
    pub confirmations: Arc<dyn ConfirmationStore>,
    pub rolls: Arc<dyn RollLookup>,
    pub dice: Arc<dyn DicePort>,
    pub effects: Arc<dyn EffectPort>,
    pub notifier: Arc<dyn NotificationPort>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    pub table_clock: Arc<dyn TableClockPort>,
}

/// Main application state.
pub struct App {
    pub settings: EngineSettings,
    pub ports: HostPorts,
    pub afflictions: AfflictionUseCases,
}

impl App {
    /// Create a new App with all use cases wired to `ports`.
    pub fn new(settings: EngineSettings, ports: HostPorts) -> Self {
        let store = ports.store.clone();
        let table_clock = ports.table_clock.clone();

        let progression = Arc::new(Progression::new(
            store.clone(),
            ports.effects.clone(),
            ports.notifier.clone(),
            ports.dice.clone(),
            ports.random.clone(),
            table_clock.clone(),
            settings.clone(),
        ));

        let exposure = Arc::new(ApplyExposure::new(
            progression.clone(),
            store.clone(),
            table_clock.clone(),
        ));
        let initial_save = Arc::new(HandleInitialSave::new(
            progression.clone(),
            exposure.clone(),
            store.clone(),
            table_clock.clone(),
        ));
        let stage_save = Arc::new(HandleStageSave::new(
            progression.clone(),
            store.clone(),
            table_clock.clone(),
        ));
        let preview_save = Arc::new(PreviewSave::new(
            store.clone(),
            ports.confirmations.clone(),
            ports.rolls.clone(),
            ports.clock.clone(),
        ));

        let afflictions = AfflictionUseCases {
            prompt_initial_save: Arc::new(affliction::PromptInitialSave::new(
                store.clone(),
                ports.catalog.clone(),
                ports.clock.clone(),
                table_clock.clone(),
            )),
            initial_save: initial_save.clone(),
            stage_save: stage_save.clone(),
            tick: Arc::new(affliction::Tick::new(
                progression.clone(),
                store.clone(),
                table_clock.clone(),
            )),
            exposure,
            manual_change: Arc::new(affliction::ManualStageChange::new(
                progression.clone(),
                store.clone(),
                table_clock.clone(),
            )),
            remove: Arc::new(affliction::RemoveAffliction::new(
                progression.clone(),
                store.clone(),
            )),
            accept_expiry: Arc::new(affliction::AcceptExpiry::new(
                progression.clone(),
                store.clone(),
            )),
            cleanse: Arc::new(affliction::Cleanse::new(
                progression.clone(),
                store.clone(),
                table_clock.clone(),
            )),
            treatment: Arc::new(affliction::ApplyTreatment::new(
                progression.clone(),
                store.clone(),
            )),
            counteract: Arc::new(affliction::Counteract::new(
                progression.clone(),
                store.clone(),
            )),
            preview_save: preview_save.clone(),
            confirm_save: Arc::new(affliction::ConfirmSave::new(
                ports.confirmations.clone(),
                ports.rolls.clone(),
                initial_save.clone(),
                stage_save.clone(),
            )),
            submit_save: Arc::new(affliction::SubmitSave::new(
                settings.require_confirmation,
                ports.rolls.clone(),
                preview_save,
                initial_save,
                stage_save,
            )),
            resolve_definition: Arc::new(affliction::ResolveDefinition::new(
                ports.catalog.clone(),
                settings.locale,
            )),
            edit_definition: Arc::new(affliction::EditDefinition::new(
                ports.catalog.clone(),
                ports.clock.clone(),
            )),
            apply_edited_definition: Arc::new(affliction::ApplyEditedDefinition::new(
                progression,
                store,
                ports.catalog.clone(),
            )),
        };

        Self {
            settings,
            ports,
            afflictions,
        }
    }

    /// An App backed entirely by in-memory adapters.
    ///
    /// The returned handle drives the table clock and records rolls, effects
    /// and notices.
    pub fn in_memory(settings: EngineSettings) -> (Self, InMemoryHost) {
        Self::in_memory_with_random(settings, Arc::new(SystemRandom::new()))
    }

    pub fn in_memory_with_random(
        settings: EngineSettings,
        random: Arc<dyn RandomPort>,
    ) -> (Self, InMemoryHost) {
        let host = InMemoryHost {
            store: Arc::new(InMemoryAfflictionStore::new()),
            catalog: Arc::new(InMemoryDefinitionCatalog::new()),
            rolls: Arc::new(RollLog::new()),
            effects: Arc::new(RecordingEffects::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            table_clock: Arc::new(ManualTableClock::new(0)),
        };
        let ports = HostPorts {
            store: host.store.clone(),
            catalog: host.catalog.clone(),
            confirmations: Arc::new(InMemoryConfirmationStore::new()),
            rolls: host.rolls.clone(),
            dice: Arc::new(RandomDice::new(random.clone())),
            effects: host.effects.clone(),
            notifier: host.notifier.clone(),
            clock: Arc::new(SystemClock::new()),
            random,
            table_clock: host.table_clock.clone(),
        };
        (Self::new(settings, ports), host)
    }
}

/// Concrete handles onto an in-memory App's adapters.
pub struct InMemoryHost {
    pub store: Arc<InMemoryAfflictionStore>,
    pub catalog: Arc<InMemoryDefinitionCatalog>,
    pub rolls: Arc<RollLog>,
    pub effects: Arc<RecordingEffects>,
    pub notifier: Arc<RecordingNotifier>,
    pub table_clock: Arc<ManualTableClock>,
}

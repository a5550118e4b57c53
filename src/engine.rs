//! Synchronization of host commands onto physical GPIO ports.
//!
//! A cycle runs in two steps:
//!
//! 1. [`Engine::stage()`] decodes a command buffer into a candidate state and queues every port
//!    whose mode or pull changes, either for the make-safe phase (new mode is input) or for the
//!    drive phase (new mode is output).  No hardware is touched.
//! 2. [`Engine::commit()`] reconfigures all make-safe ports, then all drive ports, then writes
//!    output levels and publishes the candidate as the new live state.
//!
//! Because every port which stops driving is reconfigured before any port starts driving, two
//! outputs are never connected to each other with conflicting levels during a transition.
//!
//! A hardware fault aborts the commit and keeps the previous live state.  Ports the aborted commit
//! already touched are remembered as unsettled and are rewritten by the next stage, even when the
//! new command matches the live state.
use crate::command::{decode_trigger, PortCommand, Trigger};
use crate::common::{GpioBackend, Level, PinIndex, PortIndex, PINS_PER_PORT, PORT_COUNT};
use crate::error::{Error, Phase};
use crate::report::Report;
use crate::sequencer::{SwitchPhase, SwitchSequencer};
use crate::state::DigitalState;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Physically reconfigure ports which the host marks inactive.
    ///
    /// When `false`, an inactive port only reverts to the default configuration logically and no
    /// hardware call is made for it.  When `true`, it is additionally queued for the make-safe
    /// phase whenever its live mode or pull differ from the default.
    pub release_inactive_ports: bool,
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            release_inactive_ports: false,
        }
    }

    pub const fn with_release_inactive_ports(mut self, release: bool) -> Self {
        self.release_inactive_ports = release;
        self
    }
}

/// Hardware activity of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommitSummary {
    /// Reconfigured ports in call order.
    pub reconfigured: heapless::Vec<PortIndex, PORT_COUNT>,
    /// Number of individual pin writes.
    pub pins_written: usize,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.reconfigured.is_empty() && self.pins_written == 0
    }
}

/// Hardware of a port which may no longer match the live state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Unsettled {
    io: bool,
    pins: bool,
}

const SETTLED: [Unsettled; PORT_COUNT] = [Unsettled {
    io: false,
    pins: false,
}; PORT_COUNT];

/// Digital I/O synchronization engine.
///
/// The engine owns the live and candidate state as well as the backend.  Everything that changes
/// either state goes through `&mut self`, so a cycle can never be interleaved with another one.
pub struct Engine<B: GpioBackend> {
    backend: B,
    config: EngineConfig,
    live: DigitalState,
    candidate: Option<DigitalState>,
    sequencer: SwitchSequencer,
    trigger: Trigger,
    unsettled: [Unsettled; PORT_COUNT],
}

impl<B: GpioBackend> Engine<B> {
    /// Create an engine with all ports in their default configuration.
    ///
    /// This does not touch the hardware, call [`Engine::init()`] to apply the defaults.
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let live = DigitalState::new(backend.pin_map());
        Self {
            backend,
            config,
            live,
            candidate: None,
            sequencer: SwitchSequencer::new(),
            trigger: Trigger::DontCare,
            unsettled: SETTLED,
        }
    }

    /// Configure every port with its live configuration, in port order.
    ///
    /// If this fails, every port is reconfigured by the next commit.
    pub fn init(&mut self) -> Result<(), Error<B::Error>> {
        for unsettled in &mut self.unsettled {
            unsettled.io = true;
        }
        for (port, runtime) in self.live.iter() {
            trace!("setup port {}", port.get());
            self.backend
                .configure_port(port, &runtime.config)
                .map_err(Error::fault(Phase::Setup))?;
        }
        for unsettled in &mut self.unsettled {
            unsettled.io = false;
        }
        Ok(())
    }

    /// Drop all state and return every port to its default configuration.
    pub fn reset(&mut self) -> Result<(), Error<B::Error>> {
        self.live = DigitalState::new(self.backend.pin_map());
        self.candidate = None;
        self.sequencer.reset();
        self.trigger = Trigger::DontCare;
        self.unsettled = SETTLED;
        self.init()
    }

    /// Decode `command` into a candidate state and queue the required port switches.
    ///
    /// `command` must hold at least one byte per port, trailing bytes are ignored.  Staging again
    /// before committing discards the previous candidate.
    ///
    /// Ports left unsettled by a failed commit are queued again regardless of the live state.
    pub fn stage(&mut self, command: &[u8]) -> Result<&DigitalState, Error<B::Error>> {
        if command.len() < PORT_COUNT {
            warn!(
                "rejecting command of {} bytes, expected {}",
                command.len(),
                PORT_COUNT
            );
            return Err(Error::MalformedInput {
                expected: PORT_COUNT,
                actual: command.len(),
            });
        }

        self.sequencer.reset();
        let mut candidate = self.live.clone();

        for (port, &raw) in PortIndex::all().zip(command) {
            let cmd = PortCommand::new(raw);
            let live = self.live.port(port);
            let unsettled = self.unsettled[port.get()];
            let next = candidate.port_mut(port);

            if !cmd.active() {
                next.revert_to_default();
                // An unsettled port may still be driving, it is always made safe.
                if unsettled.io
                    || (self.config.release_inactive_ports
                        && next.config.io_differs(&live.config))
                {
                    next.changed_io = true;
                    // Each port is queued at most once, so this cannot overflow.
                    let _ = self.sequencer.push(SwitchPhase::MakeSafe, port);
                }
                continue;
            }

            next.config.mode = cmd.mode();
            next.config.pull = cmd.pull();
            next.changed_io = unsettled.io || next.config.io_differs(&live.config);

            if next.changed_io {
                let phase = if next.config.mode.is_driving() {
                    SwitchPhase::Drive
                } else {
                    SwitchPhase::MakeSafe
                };
                let _ = self.sequencer.push(phase, port);
            }

            if next.config.mode.is_driving() {
                next.pins = cmd.pins();
                next.changed_pin = next.changed_io || unsettled.pins || next.pins != live.pins;
            } else {
                // Input levels come from the read path, not from the host.
                next.changed_pin = false;
            }
        }

        debug!(
            "staged cycle: {} make-safe, {} drive",
            self.sequencer.len(SwitchPhase::MakeSafe),
            self.sequencer.len(SwitchPhase::Drive)
        );
        Ok(&*self.candidate.insert(candidate))
    }

    /// Apply the staged candidate to the hardware and publish it as the live state.
    ///
    /// On a hardware fault the remaining steps are skipped and the live state stays at the last
    /// successful commit.  Ports touched before the fault are rewritten by the next stage.  Either
    /// way the candidate is consumed and the sequencer is emptied.
    pub fn commit(&mut self) -> Result<CommitSummary, Error<B::Error>> {
        let mut summary = CommitSummary::default();
        let Some(mut next) = self.candidate.take() else {
            self.sequencer.reset();
            return Ok(summary);
        };

        let result = self.apply(&next, &mut summary);
        self.sequencer.reset();
        if let Err(Error::HardwareFault { phase, .. }) = &result {
            warn!("hardware fault during {}, cycle dropped", phase);
        }
        result?;

        next.clear_change_flags();
        self.live = next;
        self.unsettled = SETTLED;
        Ok(summary)
    }

    fn apply(
        &mut self,
        next: &DigitalState,
        summary: &mut CommitSummary,
    ) -> Result<(), Error<B::Error>> {
        // The make-safe phase must be complete before the first port starts driving.
        for (phase, fault) in [
            (SwitchPhase::MakeSafe, Phase::MakeSafe),
            (SwitchPhase::Drive, Phase::Drive),
        ] {
            while let Some(port) = self.sequencer.pop(phase) {
                let config = &next.port(port).config;
                trace!("reconfigure port {} as {}", port.get(), config.mode);
                self.unsettled[port.get()].io = true;
                self.backend
                    .configure_port(port, config)
                    .map_err(Error::fault(fault))?;
                // Each port is queued at most once, so this cannot overflow.
                let _ = summary.reconfigured.push(port);
            }
        }

        for (port, runtime) in next.iter().filter(|(_, r)| r.changed_pin) {
            trace!("write pins of port {}: {=u8:b}", port.get(), runtime.pin_bits());
            self.unsettled[port.get()].pins = true;
            for pin in PinIndex::all() {
                self.backend
                    .write_pin(port, pin, runtime.pin(pin))
                    .map_err(Error::fault(Phase::PinWrite))?;
                summary.pins_written += 1;
            }
        }
        Ok(())
    }

    /// Decode the trigger, stage and commit `command` as one cycle.
    ///
    /// The trigger is only updated when the cycle completes, a malformed command or a hardware
    /// fault leaves it unchanged.
    pub fn process(&mut self, command: &[u8]) -> Result<Trigger, Error<B::Error>> {
        self.stage(command)?;
        self.commit()?;
        self.trigger = decode_trigger(command);
        Ok(self.trigger)
    }

    /// Refresh all live pin levels from the hardware.
    ///
    /// Levels are only published once every pin was read successfully.
    pub fn read_all(&mut self) -> Result<(), Error<B::Error>> {
        let mut levels = [[Level::Low; PINS_PER_PORT]; PORT_COUNT];
        for port in PortIndex::all() {
            for pin in PinIndex::all() {
                levels[port.get()][pin.get()] = self
                    .backend
                    .read_pin(port, pin)
                    .map_err(Error::fault(Phase::Read))?;
            }
        }
        for port in PortIndex::all() {
            self.live.port_mut(port).pins = levels[port.get()];
        }
        Ok(())
    }

    /// Status report of the live state.
    pub fn report(&self) -> Report {
        Report::encode(&self.live)
    }

    /// Read all pins and build a status report, once per polling interval.
    pub fn poll(&mut self) -> Result<Report, Error<B::Error>> {
        self.read_all()?;
        Ok(self.report())
    }

    pub fn live(&self) -> &DigitalState {
        &self.live
    }

    /// The staged, not yet committed state.
    pub fn candidate(&self) -> Option<&DigitalState> {
        self.candidate.as_ref()
    }

    pub fn sequencer(&self) -> &SwitchSequencer {
        &self.sequencer
    }

    /// Trigger flag of the last successfully processed command.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct access to the backend.  Changing the hardware behind the engine's back makes the
    /// live state stale until the next commit or read.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give back the backend.
    pub fn release(self) -> B {
        self.backend
    }
}

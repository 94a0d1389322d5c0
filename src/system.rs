//!
//! The scheduler: clock, tick loop and the entity state machine.
//!

use crate::entity::{Entity, EntityId, EntitySlot, EntityState};
use crate::error::SimError;
use crate::event::{
    is_timing_tag, EventId, EventKind, EventRecord, Payload, QueueTag, RemoveToken, SpawnRecord,
};
use crate::limit::StopCondition;
use crate::predicate::Predicate;
use crate::queue::{DeferredQueue, EventQueue, FutureQueue, TimingQueue};
use crate::time::SimTime;

use fxhash::FxHashMap;
use rand::rngs::StdRng;

#[derive(Debug, PartialEq, Eq)]
enum State {
    Ready,
    Running,
    Halted,
}

/// The outcome of a completed [`Simulation::run`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    /// The clock value after the last processed instant.
    pub time: SimTime,
    /// The number of events processed over the whole run.
    pub events_processed: usize,
    /// `true` if the run drained every event; `false` if the stop
    /// condition or an abort cut it short.
    pub completed: bool,
}

///
/// The central management point of a simulation run.
///
/// Owns the three event queues, the entity registry, the clock and the
/// RNG. Logically single threaded: at any instant exactly one entity's
/// logic runs, invoked synchronously from within event delivery, so the
/// queues and registry are never mutated concurrently.
///
pub struct Simulation {
    state: State,
    clock: SimTime,
    processed: usize,
    next_event_id: EventId,

    future: FutureQueue,
    deferred: DeferredQueue,
    timing: TimingQueue,

    entities: Vec<EntitySlot>,
    names: FxHashMap<String, EntityId>,

    pub(crate) rng: StdRng,
    pub(crate) stop: StopCondition,
}

impl Simulation {
    /// Creates a simulation with entropy-seeded randomness. Use
    /// [`Builder::seeded`](crate::builder::Builder::seeded) for
    /// reproducible runs.
    #[must_use]
    pub fn new() -> Self {
        crate::builder::Builder::new().build()
    }

    pub(crate) fn from_parts(rng: StdRng, start_time: SimTime, stop: StopCondition) -> Self {
        Self {
            state: State::Ready,
            clock: start_time,
            processed: 0,
            next_event_id: 0,
            future: FutureQueue::new(),
            deferred: DeferredQueue::new(),
            timing: TimingQueue::new(),
            entities: Vec::new(),
            names: FxHashMap::default(),
            rng,
            stop,
        }
    }

    /// Returns the current simulation clock.
    #[must_use]
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Returns the number of events processed so far.
    #[must_use]
    pub fn events_processed(&self) -> usize {
        self.processed
    }

    /// Returns the number of events still queued across all three queues.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.future.len() + self.timing.len() + self.deferred.len()
    }

    // --- entity registry -------------------------------------------------

    ///
    /// Registers an entity under a unique name, returning its stable id.
    ///
    /// Static registration happens before [`run_start`](Self::run_start);
    /// mid-run admission goes through [`spawn`](Self::spawn) instead.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NameTaken`] if the name is already registered.
    ///
    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        logic: Box<dyn Entity>,
    ) -> Result<EntityId, SimError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(SimError::NameTaken(name));
        }
        let id = self.entities.len();
        self.names.insert(name.clone(), id);
        self.entities.push(EntitySlot::new(name, logic));
        Ok(id)
    }

    /// Looks up an entity id by its unique name.
    #[must_use]
    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Returns the name an entity was registered under.
    #[must_use]
    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id).map(|slot| slot.name.as_str())
    }

    /// Returns the scheduling state of an entity.
    #[must_use]
    pub fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(id).map(|slot| slot.state)
    }

    /// Returns the event currently held in an entity's mailbox.
    #[must_use]
    pub fn mailbox(&self, id: EntityId) -> Option<&EventRecord> {
        self.entities.get(id).and_then(|slot| slot.mailbox.as_ref())
    }

    /// Takes the event out of an entity's mailbox.
    pub fn take_mailbox(&mut self, id: EntityId) -> Option<EventRecord> {
        self.entities.get_mut(id).and_then(|slot| slot.mailbox.take())
    }

    // --- lifecycle -------------------------------------------------------

    ///
    /// Starts the run: invokes every registered entity's `start` hook, in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Propagates the first entity start failure; the run counts as
    /// aborted.
    ///
    /// # Panics
    ///
    /// Panics if called on a run that already started.
    ///
    pub fn run_start(&mut self) -> Result<(), SimError> {
        assert_eq!(
            self.state,
            State::Ready,
            "run_start can only be used on a simulation in the ready state"
        );
        self.state = State::Running;
        tracing::info!(
            entities = self.entities.len(),
            pending = self.pending_events(),
            "simulation starting"
        );

        for id in 0..self.entities.len() {
            self.start_entity(id)?;
        }
        Ok(())
    }

    ///
    /// Drives one instant of simulated time: advances the clock to the
    /// next due instant and drains every event at it, including any
    /// zero-delay chain produced while draining.
    ///
    /// Returns `false` once no event remains or the run was aborted.
    ///
    /// # Errors
    ///
    /// Protocol violations and entity step failures abort the run.
    ///
    pub fn run_tick(&mut self) -> Result<bool, SimError> {
        if self.state != State::Running {
            return Ok(false);
        }

        let Some(now) = self.next_time() else {
            self.state = State::Halted;
            return Ok(false);
        };
        if now < self.clock {
            return Err(SimError::PastEvent {
                time: now,
                clock: self.clock,
            });
        }

        tracing::trace!(clock = %now, "advancing clock");
        self.clock = now;

        self.drain_future_at(now)?;

        // Each resolved firing may schedule further events due right now,
        // so the future queue is re-drained after every single draw.
        while self.timing.next_time() == Some(now) {
            let event = self
                .timing
                .pop(&mut self.rng)
                .expect("timing queue head was just observed");
            tracing::trace!(id = event.id, "stochastic firing resolved");
            self.future.add(event);
            self.drain_future_at(now)?;
        }

        Ok(true)
    }

    ///
    /// Runs until no event remains, the configured stop condition is
    /// reached, or the run is aborted. The condition is checked between
    /// ticks, so every event of an instant that started processing is
    /// still handled (an event cap can overshoot by the size of a
    /// simultaneous batch).
    ///
    /// # Errors
    ///
    /// Propagates the first protocol violation or entity failure.
    ///
    pub fn run(&mut self) -> Result<RunResult, SimError> {
        if self.state == State::Ready {
            self.run_start()?;
        }

        loop {
            match self.next_time() {
                Some(next) if self.stop.reached(self.processed, next) => {
                    tracing::info!(stop = %self.stop, "stop condition reached");
                    break;
                }
                Some(_) => {}
                None => break,
            }
            if !self.run_tick()? {
                break;
            }
        }

        let completed = self.future.is_empty() && self.timing.is_empty();
        tracing::info!(
            time = %self.clock,
            events = self.processed,
            completed,
            "simulation ended"
        );
        Ok(RunResult {
            time: self.clock,
            events_processed: self.processed,
            completed,
        })
    }

    /// Requests cooperative termination: every entity is marked done and
    /// the run halts.
    pub fn run_stop(&mut self) {
        for slot in &mut self.entities {
            slot.state = EntityState::Done;
            slot.waiting_predicate = None;
        }
        self.state = State::Halted;
    }

    /// Marks the run as non-running; the next tick returns cleanly. Not
    /// an error.
    pub fn abort(&mut self) {
        self.state = State::Halted;
    }

    // --- scheduling primitives -------------------------------------------

    ///
    /// Schedules a `HoldDone` self-timeout for `src`, due `delay` time
    /// units from now.
    ///
    pub fn hold(&mut self, src: EntityId, delay: f64) -> RemoveToken {
        let event = EventRecord {
            id: self.next_id(),
            kind: EventKind::HoldDone,
            time: self.clock.after(delay),
            src,
            dest: None,
            tag: 0,
            payload: Payload::Empty,
        };
        let token = RemoveToken {
            id: event.id,
            origin: QueueTag::Future,
        };
        self.future.add(event);
        token
    }

    ///
    /// Schedules a `Send` from `src` to `dest`, due `delay` time units
    /// from now. Routed through the timing queue if the tag carries the
    /// timing bit, through the future queue otherwise.
    ///
    /// # Errors
    ///
    /// A timing-tagged send without a firing descriptor payload is a
    /// protocol violation.
    ///
    pub fn send(
        &mut self,
        src: EntityId,
        dest: EntityId,
        delay: f64,
        tag: i32,
        payload: Payload,
    ) -> Result<RemoveToken, SimError> {
        let timing = is_timing_tag(tag);
        if timing && payload.firing().is_none() {
            return Err(SimError::MissingFiring);
        }

        let event = EventRecord {
            id: self.next_id(),
            kind: EventKind::Send,
            time: self.clock.after(delay),
            src,
            dest: Some(dest),
            tag,
            payload,
        };
        let token = RemoveToken {
            id: event.id,
            origin: if timing {
                QueueTag::Timing
            } else {
                QueueTag::Future
            },
        };
        if timing {
            self.timing.add(event);
        } else {
            self.future.add(event);
        }
        Ok(token)
    }

    ///
    /// Schedules a `Create` event admitting a new entity `delay` time
    /// units from now.
    ///
    pub fn spawn(
        &mut self,
        src: EntityId,
        delay: f64,
        name: impl Into<String>,
        logic: Box<dyn Entity>,
    ) -> RemoveToken {
        let event = EventRecord {
            id: self.next_id(),
            kind: EventKind::Create,
            time: self.clock.after(delay),
            src,
            dest: None,
            tag: 0,
            payload: Payload::Spawn(SpawnRecord {
                name: name.into(),
                logic,
            }),
        };
        let token = RemoveToken {
            id: event.id,
            origin: QueueTag::Future,
        };
        self.future.add(event);
        token
    }

    ///
    /// Scans the deferred queue for the first event destined for `dest`
    /// matching the predicate. On a hit the event is delivered into the
    /// mailbox; on a miss the mailbox is cleared and the entity suspends
    /// on that predicate.
    ///
    pub fn wait(&mut self, dest: EntityId, predicate: Predicate) -> bool {
        if self.select(dest, &predicate) {
            return true;
        }
        if let Some(slot) = self.entities.get_mut(dest) {
            slot.state = EntityState::Waiting;
            slot.waiting_predicate = Some(predicate);
        }
        false
    }

    ///
    /// Like [`wait`](Self::wait), but a miss leaves the entity's state
    /// untouched: the mailbox is simply cleared.
    ///
    pub fn select(&mut self, dest: EntityId, predicate: &Predicate) -> bool {
        match self.deferred.take_first_match(dest, predicate) {
            Some(event) => {
                tracing::trace!(id = event.id, dest, "selected deferred event");
                if let Some(slot) = self.entities.get_mut(dest) {
                    slot.mailbox = Some(event);
                }
                true
            }
            None => {
                if let Some(slot) = self.entities.get_mut(dest) {
                    slot.mailbox = None;
                }
                false
            }
        }
    }

    /// Counts deferred events destined for `dest` that match the
    /// predicate, without removing any.
    #[must_use]
    pub fn waiting_count(&self, dest: EntityId, predicate: &Predicate) -> usize {
        self.deferred.waiting_count(dest, predicate)
    }

    ///
    /// Retracts the earliest-due future event scheduled by `src` that
    /// matches the predicate, delivering it into the canceling entity's
    /// mailbox. Touches only the future queue.
    ///
    pub fn cancel(&mut self, src: EntityId, predicate: &Predicate) -> bool {
        match self.future.remove_first_match(src, predicate) {
            Some(event) => {
                tracing::trace!(id = event.id, src, "cancelled future event");
                if let Some(slot) = self.entities.get_mut(src) {
                    slot.mailbox = Some(event);
                }
                true
            }
            None => false,
        }
    }

    ///
    /// Removes the exact event a token refers to from whichever queue
    /// currently holds it, starting with the queue it was scheduled into.
    ///
    pub fn remove(&mut self, token: RemoveToken) -> Option<EventRecord> {
        let id = token.id;
        match token.origin {
            QueueTag::Future => self
                .future
                .remove(id)
                .or_else(|| self.timing.remove(id))
                .or_else(|| self.deferred.remove(id)),
            QueueTag::Timing => self
                .timing
                .remove(id)
                .or_else(|| self.future.remove(id))
                .or_else(|| self.deferred.remove(id)),
            QueueTag::Deferred => self
                .deferred
                .remove(id)
                .or_else(|| self.future.remove(id))
                .or_else(|| self.timing.remove(id)),
        }
    }

    /// Returns an undeliverable event to the deferred queue, keeping its
    /// identity.
    pub fn putback(&mut self, event: EventRecord) -> RemoveToken {
        let token = RemoveToken {
            id: event.id,
            origin: QueueTag::Deferred,
        };
        self.deferred.add(event);
        token
    }

    // --- internals -------------------------------------------------------

    fn next_id(&mut self) -> EventId {
        let id = self.next_event_id;
        self.next_event_id += 1;
        id
    }

    /// The next due instant over both time-ordered queues.
    fn next_time(&mut self) -> Option<SimTime> {
        match (self.future.next_time(), self.timing.next_time()) {
            (Some(f), Some(t)) => Some(f.min(t)),
            (Some(f), None) => Some(f),
            (None, Some(t)) => Some(t),
            (None, None) => None,
        }
    }

    /// Drains and processes every future-queue event due at `now`,
    /// including events scheduled at `now` while draining.
    fn drain_future_at(&mut self, now: SimTime) -> Result<(), SimError> {
        while self.future.next_time() == Some(now) {
            let event = self
                .future
                .pop()
                .expect("future queue head was just observed");
            if event.time < self.clock {
                return Err(SimError::PastEvent {
                    time: event.time,
                    clock: self.clock,
                });
            }
            self.processed += 1;
            self.process(event)?;
        }
        Ok(())
    }

    fn process(&mut self, event: EventRecord) -> Result<(), SimError> {
        match event.kind {
            EventKind::Null => Err(SimError::NullEvent),

            EventKind::Send => {
                let dest = event.dest.ok_or(SimError::MissingDestination)?;
                let Some(slot) = self.entities.get(dest) else {
                    return Err(SimError::UnknownEntity(dest));
                };
                if slot.accepts(&event) {
                    tracing::trace!(id = event.id, dest, tag = event.tag, "delivering");
                    self.deliver(dest, event)
                } else {
                    tracing::debug!(
                        id = event.id,
                        dest,
                        tag = event.tag,
                        "destination not receptive, deferring"
                    );
                    self.deferred.add(event);
                    Ok(())
                }
            }

            EventKind::HoldDone => {
                let src = event.src;
                let Some(slot) = self.entities.get(src) else {
                    return Err(SimError::UnknownEntity(src));
                };
                if slot.state == EntityState::Done {
                    return Ok(());
                }
                tracing::trace!(id = event.id, src, "hold elapsed");
                self.deliver(src, event)
            }

            EventKind::Create => {
                let Payload::Spawn(spawn) = event.payload else {
                    return Err(SimError::MalformedCreate);
                };
                let id = self.add_entity(spawn.name, spawn.logic)?;
                tracing::info!(id, name = %self.entities[id].name, "entity admitted mid-run");
                self.start_entity(id)
            }
        }
    }

    /// Moves the event into the mailbox, wakes the entity and steps it
    /// synchronously.
    fn deliver(&mut self, id: EntityId, event: EventRecord) -> Result<(), SimError> {
        let slot = &mut self.entities[id];
        slot.mailbox = Some(event);
        slot.state = EntityState::Runnable;
        slot.waiting_predicate = None;
        self.step_entity(id)
    }

    fn step_entity(&mut self, id: EntityId) -> Result<(), SimError> {
        let mut logic = self.entities[id]
            .logic
            .take()
            .expect("entity stepped while already running");
        let mut ctx = Ctx { sim: self, id };
        let result = logic.step(&mut ctx);
        self.entities[id].logic = Some(logic);
        result
    }

    fn start_entity(&mut self, id: EntityId) -> Result<(), SimError> {
        let mut logic = self.entities[id]
            .logic
            .take()
            .expect("entity started while already running");
        let mut ctx = Ctx { sim: self, id };
        let result = logic.start(&mut ctx);
        self.entities[id].logic = Some(logic);
        result
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Simulation {{ clock: {} processed: {} pending: {} entities: {} }}",
            self.clock,
            self.processed,
            self.pending_events(),
            self.entities.len()
        )
    }
}

///
/// The kernel surface an entity's logic sees while it is being stepped.
///
/// Every scheduling primitive issued through a `Ctx` uses the stepped
/// entity as its source.
///
pub struct Ctx<'a> {
    sim: &'a mut Simulation,
    id: EntityId,
}

impl Ctx<'_> {
    /// The id of the entity being stepped.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The current simulation clock.
    #[must_use]
    pub fn clock(&self) -> SimTime {
        self.sim.clock()
    }

    /// The event delivered into this entity's mailbox, if any.
    #[must_use]
    pub fn mailbox(&self) -> Option<&EventRecord> {
        self.sim.mailbox(self.id)
    }

    /// Takes the delivered event out of the mailbox.
    pub fn take_mailbox(&mut self) -> Option<EventRecord> {
        self.sim.take_mailbox(self.id)
    }

    /// Schedules a self-timeout. See [`Simulation::hold`].
    pub fn hold(&mut self, delay: f64) -> RemoveToken {
        self.sim.hold(self.id, delay)
    }

    /// Sends an event to another entity. See [`Simulation::send`].
    ///
    /// # Errors
    ///
    /// A timing-tagged send without a firing descriptor is rejected.
    pub fn send(
        &mut self,
        dest: EntityId,
        delay: f64,
        tag: i32,
        payload: Payload,
    ) -> Result<RemoveToken, SimError> {
        self.sim.send(self.id, dest, delay, tag, payload)
    }

    /// Admits a new entity mid-run. See [`Simulation::spawn`].
    pub fn spawn(
        &mut self,
        delay: f64,
        name: impl Into<String>,
        logic: Box<dyn Entity>,
    ) -> RemoveToken {
        self.sim.spawn(self.id, delay, name, logic)
    }

    /// Selective receive that suspends on a miss. See
    /// [`Simulation::wait`].
    pub fn wait(&mut self, predicate: Predicate) -> bool {
        self.sim.wait(self.id, predicate)
    }

    /// Selective receive without suspension. See [`Simulation::select`].
    pub fn select(&mut self, predicate: &Predicate) -> bool {
        self.sim.select(self.id, predicate)
    }

    /// Counts deferred events this entity could select.
    #[must_use]
    pub fn waiting_count(&self, predicate: &Predicate) -> usize {
        self.sim.waiting_count(self.id, predicate)
    }

    /// Retracts a previously scheduled future event. See
    /// [`Simulation::cancel`].
    pub fn cancel(&mut self, predicate: &Predicate) -> bool {
        self.sim.cancel(self.id, predicate)
    }

    /// Removes the exact event a token refers to. See
    /// [`Simulation::remove`].
    pub fn remove(&mut self, token: RemoveToken) -> Option<EventRecord> {
        self.sim.remove(token)
    }

    /// Returns an event to the deferred queue. See
    /// [`Simulation::putback`].
    pub fn putback(&mut self, event: EventRecord) -> RemoveToken {
        self.sim.putback(event)
    }

    /// Marks this entity as finished; it will never be stepped again.
    pub fn set_done(&mut self) {
        let slot = &mut self.sim.entities[self.id];
        slot.state = EntityState::Done;
        slot.waiting_predicate = None;
    }
}

use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::catalog::RouteCatalog;
use crate::error::Result;
use crate::timetables::{format_countdown, resolve, Clock};
use crate::ui::{Frame, Output, PLACEHOLDER_TIME};

pub const TICK: Duration = Duration::from_secs(1);

/// User input, one per line typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Route id or 1-based route number.
    Select(String),
    Refresh,
    List,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "r" => Command::Refresh,
            "l" => Command::List,
            "q" => Command::Quit,
            key => Command::Select(key.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Counting { route_id: String },
}

/// Selection and countdown timer state. Only the display loop touches it.
///
/// The timer is tracked as a generation number; the async driver mirrors it
/// with a real interval. Arming always cancels the previous timer first.
pub struct AppState {
    catalog: Arc<RouteCatalog>,
    current_route: Option<String>,
    phase: Phase,
    timer: Option<u64>,
    generation: u64,
    cancellations: u64,
}

impl AppState {
    /// Starts with the route named by `initial` (id or number), or the first
    /// route of the catalog.
    pub fn new(catalog: Arc<RouteCatalog>, initial: Option<&str>) -> Self {
        let current_route = match initial {
            Some(key) => Some(
                catalog
                    .lookup(key)
                    .map_or_else(|| key.to_owned(), |route| route.id.clone()),
            ),
            None => catalog.first().map(|route| route.id.clone()),
        };

        Self {
            catalog,
            current_route,
            phase: Phase::Idle,
            timer: None,
            generation: 0,
            cancellations: 0,
        }
    }

    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    #[cfg(test)]
    pub fn current_route(&self) -> Option<&str> {
        self.current_route.as_deref()
    }

    #[cfg(test)]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Generation of the armed timer, `None` when no timer runs.
    pub fn timer(&self) -> Option<u64> {
        self.timer
    }

    /// How many armed timers have been cancelled so far.
    #[cfg(test)]
    pub fn cancellations(&self) -> u64 {
        self.cancellations
    }

    pub fn select(&mut self, key: &str, now: NaiveDateTime) -> Frame {
        let route_id = match self.catalog.lookup(key) {
            Some(route) => route.id.clone(),
            None => {
                warn!(route = key, "Unknown route selected");
                key.to_owned()
            }
        };
        info!(route = %route_id, "Route selected");
        self.current_route = Some(route_id);

        self.start_cycle(now)
    }

    pub fn refresh(&mut self, now: NaiveDateTime) -> Frame {
        debug!("Refresh requested");
        self.start_cycle(now)
    }

    /// Cancels any running countdown and starts a new one for the current
    /// route.
    pub fn start_cycle(&mut self, now: NaiveDateTime) -> Frame {
        self.cancel_timer();

        let catalog = Arc::clone(&self.catalog);
        let route = match self.current_route.as_deref().and_then(|id| catalog.get(id)) {
            Some(route) => route,
            None => {
                self.phase = Phase::Idle;
                return Frame::no_selection();
            }
        };

        self.phase = Phase::Counting {
            route_id: route.id.clone(),
        };
        self.arm_timer();

        self.update(now)
    }

    /// One timer tick. `None` when there is nothing counting.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<Frame> {
        if matches!(self.phase, Phase::Counting { .. }) && self.timer.is_some() {
            Some(self.update(now))
        } else {
            None
        }
    }

    fn update(&mut self, now: NaiveDateTime) -> Frame {
        let catalog = Arc::clone(&self.catalog);
        let route = match &self.phase {
            Phase::Counting { route_id } => catalog.get(route_id),
            Phase::Idle => None,
        };
        let route = match route {
            Some(route) => route,
            None => {
                self.cancel_timer();
                self.phase = Phase::Idle;
                return Frame::no_selection();
            }
        };

        let resolution = resolve(&route.times, now);
        let departure = resolution.departure;

        let next = match departure.next {
            Some(next) => next,
            None => {
                self.cancel_timer();
                return Frame::no_departures(&route.name);
            }
        };

        if resolution.consumed {
            info!(route = %route.id, "Departure reached, restarting countdown");
            self.cancel_timer();
            self.arm_timer();
        }

        Frame {
            route_name: Some(route.name.clone()),
            next: next.to_string(),
            following: departure
                .following
                .map_or_else(|| PLACEHOLDER_TIME.to_owned(), |t| t.to_string()),
            countdown: format_countdown(departure.ms_until_next),
            error: None,
        }
    }

    fn arm_timer(&mut self) {
        self.generation += 1;
        self.timer = Some(self.generation);
        debug!(generation = self.generation, "Timer armed");
    }

    fn cancel_timer(&mut self) {
        if let Some(generation) = self.timer.take() {
            self.cancellations += 1;
            debug!(generation, "Timer cancelled");
        }
    }
}

/// Drives [`AppState`] with a real one second interval and user commands.
pub struct DisplayLoop<C, O> {
    state: AppState,
    clock: C,
    output: O,
}

impl<C: Clock, O: Output> DisplayLoop<C, O> {
    pub fn new(state: AppState, clock: C, output: O) -> Self {
        Self {
            state,
            clock,
            output,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[cfg(test)]
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Like [`DisplayLoop::run`], but also stops as soon as `shutdown`
    /// completes.
    pub async fn run_until<F: Future>(
        &mut self,
        commands: mpsc::Receiver<Command>,
        shutdown: F,
    ) -> Result<()> {
        tokio::select! {
            result = self.run(commands) => result,
            _ = shutdown => {
                info!("Interrupted");
                Ok(())
            }
        }
    }

    /// Runs until `Command::Quit`, or until commands stop arriving while no
    /// countdown is running.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        let mut ticker: Option<Interval> = None;
        let mut armed: Option<u64> = None;
        let mut commands_open = true;

        let frame = self.state.start_cycle(self.clock.now());
        self.output.render(&frame)?;
        sync_ticker(&self.state, &mut ticker, &mut armed);

        loop {
            if !commands_open && ticker.is_none() {
                debug!("Nothing left to do");
                break;
            }

            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if let Some(frame) = self.state.tick(self.clock.now()) {
                        self.output.render(&frame)?;
                    }
                }
                command = commands.recv(), if commands_open => match command {
                    Some(Command::Quit) => break,
                    Some(Command::List) => self.output.list_routes(self.state.catalog())?,
                    Some(Command::Refresh) => {
                        let frame = self.state.refresh(self.clock.now());
                        self.output.render(&frame)?;
                    }
                    Some(Command::Select(key)) => {
                        let frame = self.state.select(&key, self.clock.now());
                        self.output.render(&frame)?;
                    }
                    None => {
                        debug!("Command input closed");
                        commands_open = false;
                    }
                },
            }

            sync_ticker(&self.state, &mut ticker, &mut armed);
        }

        Ok(())
    }
}

/// Forwards one command per input line until the input ends or the loop is
/// gone. Blocks, so it runs on its own thread: a pending read there never
/// holds up runtime shutdown.
pub fn read_commands<R: BufRead>(input: R, commands: mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read command input");
                break;
            }
        };

        if commands.blocking_send(Command::parse(&line)).is_err() {
            break;
        }
    }
    debug!("Command input finished");
}

/// Makes the interval follow the state's timer. A new generation drops the
/// old interval before the next one is created.
fn sync_ticker(state: &AppState, ticker: &mut Option<Interval>, armed: &mut Option<u64>) {
    if state.timer() == *armed {
        return;
    }

    *ticker = None;
    *armed = state.timer();
    if armed.is_some() {
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        *ticker = Some(interval);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

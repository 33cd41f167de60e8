//! Drives a rig until shutdown, in one of two concurrency models.
//!
//! Cooperative: one thread drains operator events, ticks the station, and
//! presents, paced to the sampling interval.
//!
//! Threaded: a jog worker thread owns the motor and the event queue; the
//! calling thread samples and presents. Tare and shutdown cross between them
//! as [`Signal`]s; everything else the sampler needs is forwarded on a channel.

use crate::error::Result;
use crate::events::{Notice, OperatorEvent, Presenter};
use crate::export::ChartRenderer;
use crate::jog::{JogCommand, JogController};
use crate::signal::Signal;
use crate::station::{Station, sensor_failure_notice};
use crossbeam_channel as xch;
use rig_traits::{AnalogInput, MotorLines};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Cooperative,
    Threaded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub mode: RunMode,
    /// How long the sampler waits for the jog worker to finish.
    pub join_timeout: Duration,
    /// Jog worker wake-up period while waiting for events.
    pub jog_poll: Duration,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            mode: RunMode::Cooperative,
            join_timeout: Duration::from_secs(2),
            jog_poll: Duration::from_millis(10),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// Quit request or external shutdown.
    Shutdown,
    TickLimit,
    /// Analog read failed; carries the rendered error.
    SensorFailure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub exit: ExitReason,
    /// False if the jog worker did not finish within the join timeout.
    pub worker_joined: bool,
}

/// Messages from the jog worker to the sampler.
#[derive(Debug)]
enum Forwarded {
    Event(OperatorEvent),
    Notice(Notice),
}

/// Run until shutdown. The motor is released, the driver disabled, and the analog input
/// closed before this returns. The station keeps its graph and recording for export.
pub fn run<A, M, P>(
    station: &mut Station<A>,
    jog: JogController<M>,
    events: xch::Receiver<OperatorEvent>,
    presenter: &mut P,
    renderer: Option<&mut (dyn ChartRenderer + '_)>,
    shutdown: Signal,
    params: RunParams,
) -> Result<RunSummary>
where
    A: AnalogInput,
    M: MotorLines + Send + 'static,
    P: Presenter,
{
    tracing::info!(mode = ?params.mode, interval_ms = station.interval().as_millis() as u64, "run loop starting");
    match params.mode {
        RunMode::Cooperative => Ok(run_cooperative(
            station, jog, events, presenter, renderer, shutdown, params,
        )),
        RunMode::Threaded => run_threaded(station, jog, events, presenter, renderer, shutdown, params),
    }
}

/// Sleep until the next deadline; if the loop fell behind, restart the schedule from now.
struct Pacer {
    next: Instant,
    interval: Duration,
}

impl Pacer {
    fn new(now: Instant, interval: Duration) -> Self {
        Self { next: now, interval }
    }

    fn wait(&mut self, clock: &dyn rig_traits::Clock) {
        self.next += self.interval;
        let now = clock.now();
        if self.next > now {
            clock.sleep(self.next - now);
        } else {
            self.next = now;
        }
    }
}

enum TickOutcome {
    Continue,
    Stop(ExitReason),
}

fn tick_and_present<A: AnalogInput, P: Presenter>(
    station: &mut Station<A>,
    presenter: &mut P,
    ticks: &mut u64,
    max_ticks: Option<u64>,
) -> TickOutcome {
    match station.tick() {
        Ok(_) => {
            presenter.frame(&station.frame());
            *ticks += 1;
            if max_ticks.is_some_and(|m| *ticks >= m) {
                TickOutcome::Stop(ExitReason::TickLimit)
            } else {
                TickOutcome::Continue
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "sensor read failed, stopping");
            presenter.notice(&sensor_failure_notice(&e));
            TickOutcome::Stop(ExitReason::SensorFailure(format!("{e:#}")))
        }
    }
}

fn apply_jog<M: MotorLines>(jog: &mut JogController<M>, cmd: JogCommand) -> Option<Notice> {
    match jog.apply(cmd) {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "jog command failed");
            Some(Notice::from_report(&e))
        }
    }
}

fn run_cooperative<A, M, P>(
    station: &mut Station<A>,
    mut jog: JogController<M>,
    events: xch::Receiver<OperatorEvent>,
    presenter: &mut P,
    mut renderer: Option<&mut (dyn ChartRenderer + '_)>,
    shutdown: Signal,
    params: RunParams,
) -> RunSummary
where
    A: AnalogInput,
    M: MotorLines,
    P: Presenter,
{
    let clock = station.clock();
    let mut pacer = Pacer::new(clock.now(), station.interval());
    let mut ticks = 0u64;
    let exit = 'run: loop {
        if shutdown.is_raised() {
            break ExitReason::Shutdown;
        }
        for event in events.try_iter() {
            match event {
                OperatorEvent::Jog(cmd) => {
                    if let Some(n) = apply_jog(&mut jog, cmd) {
                        presenter.notice(&n);
                    }
                }
                OperatorEvent::Rezero => station.handle_rezero(presenter),
                OperatorEvent::Quit => {
                    shutdown.raise();
                    break 'run ExitReason::Shutdown;
                }
                OperatorEvent::EndTest => {
                    if let Some(n) = apply_jog(&mut jog, JogCommand::Stop) {
                        presenter.notice(&n);
                    }
                    station.handle_event(OperatorEvent::EndTest, presenter, None);
                }
                other => station.handle_event(other, presenter, renderer.as_deref_mut()),
            }
        }
        if let TickOutcome::Stop(reason) =
            tick_and_present(station, presenter, &mut ticks, params.max_ticks)
        {
            break reason;
        }
        pacer.wait(clock.as_ref());
    };
    jog.shutdown();
    station.close();
    tracing::info!(ticks, exit = ?exit, "run loop finished");
    RunSummary {
        ticks,
        exit,
        worker_joined: true,
    }
}

fn run_threaded<A, M, P>(
    station: &mut Station<A>,
    jog: JogController<M>,
    events: xch::Receiver<OperatorEvent>,
    presenter: &mut P,
    mut renderer: Option<&mut (dyn ChartRenderer + '_)>,
    shutdown: Signal,
    params: RunParams,
) -> Result<RunSummary>
where
    A: AnalogInput,
    M: MotorLines + Send + 'static,
    P: Presenter,
{
    let (fwd_tx, fwd_rx) = xch::unbounded();
    let tare = Signal::new();
    let worker = JogWorker::spawn(
        jog,
        events,
        WorkerLinks {
            forward: Some(fwd_tx),
            tare: tare.clone(),
            shutdown: shutdown.clone(),
            poll: params.jog_poll,
            quit_on_disconnect: false,
        },
    )?;

    let clock = station.clock();
    let mut pacer = Pacer::new(clock.now(), station.interval());
    let mut ticks = 0u64;
    let exit = loop {
        if shutdown.is_raised() {
            break ExitReason::Shutdown;
        }
        if tare.take() {
            station.handle_rezero(presenter);
        }
        for msg in fwd_rx.try_iter() {
            match msg {
                Forwarded::Event(ev) => station.handle_event(ev, presenter, renderer.as_deref_mut()),
                Forwarded::Notice(n) => presenter.notice(&n),
            }
        }
        if let TickOutcome::Stop(reason) =
            tick_and_present(station, presenter, &mut ticks, params.max_ticks)
        {
            break reason;
        }
        pacer.wait(clock.as_ref());
    };
    shutdown.raise();
    let worker_joined = worker.finish(params.join_timeout);
    // Notices the worker sent while stopping.
    for msg in fwd_rx.try_iter() {
        if let Forwarded::Notice(n) = msg {
            presenter.notice(&n);
        }
    }
    station.close();
    tracing::info!(ticks, exit = ?exit, worker_joined, "run loop finished");
    Ok(RunSummary {
        ticks,
        exit,
        worker_joined,
    })
}

/// Jog with no force channel: runs the worker loop on the calling thread until shutdown.
pub fn run_jog_only<M: MotorLines>(
    jog: JogController<M>,
    events: xch::Receiver<OperatorEvent>,
    shutdown: Signal,
    poll: Duration,
) {
    tracing::info!("jog-only loop starting");
    worker_loop(
        jog,
        &events,
        &WorkerLinks {
            forward: None,
            tare: Signal::new(),
            shutdown,
            poll,
            quit_on_disconnect: true,
        },
    );
}

struct WorkerLinks {
    forward: Option<xch::Sender<Forwarded>>,
    tare: Signal,
    shutdown: Signal,
    poll: Duration,
    quit_on_disconnect: bool,
}

impl WorkerLinks {
    fn send(&self, msg: Forwarded) {
        if let Some(tx) = &self.forward
            && tx.send(msg).is_err()
        {
            tracing::debug!("sampler gone, dropping forwarded message");
        }
    }

    fn notify(&self, notice: Option<Notice>) {
        if let Some(n) = notice {
            self.send(Forwarded::Notice(n));
        }
    }
}

fn worker_loop<M: MotorLines>(
    mut jog: JogController<M>,
    events: &xch::Receiver<OperatorEvent>,
    links: &WorkerLinks,
) {
    let mut inputs_open = true;
    while !links.shutdown.is_raised() {
        if !inputs_open {
            std::thread::sleep(links.poll);
            continue;
        }
        match events.recv_timeout(links.poll) {
            Ok(OperatorEvent::Jog(cmd)) => links.notify(apply_jog(&mut jog, cmd)),
            Ok(OperatorEvent::Rezero) => {
                if links.forward.is_none() {
                    tracing::warn!("re-zero ignored: no force channel in jog mode");
                }
                links.tare.raise();
            }
            Ok(OperatorEvent::Quit) => {
                links.shutdown.raise();
                break;
            }
            Ok(OperatorEvent::EndTest) => {
                links.notify(apply_jog(&mut jog, JogCommand::Stop));
                links.send(Forwarded::Event(OperatorEvent::EndTest));
            }
            Ok(other) => links.send(Forwarded::Event(other)),
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => {
                tracing::debug!("operator input closed");
                links.notify(apply_jog(&mut jog, JogCommand::Stop));
                if links.quit_on_disconnect {
                    links.shutdown.raise();
                    break;
                }
                inputs_open = false;
            }
        }
    }
    jog.shutdown();
    tracing::debug!("jog worker exiting");
}

/// Background thread that owns the jog controller and the operator event queue.
///
/// Dropping the worker raises shutdown and waits (bounded) for the thread.
pub struct JogWorker {
    shutdown: Signal,
    done: xch::Receiver<()>,
    join_handle: Option<JoinHandle<()>>,
}

impl JogWorker {
    fn spawn<M: MotorLines + Send + 'static>(
        jog: JogController<M>,
        events: xch::Receiver<OperatorEvent>,
        links: WorkerLinks,
    ) -> Result<Self> {
        let (done_tx, done) = xch::bounded(1);
        let shutdown = links.shutdown.clone();
        let join_handle = std::thread::Builder::new()
            .name("jog".into())
            .spawn(move || {
                worker_loop(jog, &events, &links);
                let _ = done_tx.send(());
            })?;
        Ok(Self {
            shutdown,
            done,
            join_handle: Some(join_handle),
        })
    }

    /// Raise shutdown and wait up to `timeout` for the worker. Returns whether it was joined.
    pub fn finish(mut self, timeout: Duration) -> bool {
        self.stop(timeout)
    }

    fn stop(&mut self, timeout: Duration) -> bool {
        self.shutdown.raise();
        let Some(handle) = self.join_handle.take() else {
            return true;
        };
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => match handle.join() {
                Ok(()) => {
                    tracing::trace!("jog worker joined");
                    true
                }
                Err(e) => {
                    tracing::warn!(?e, "jog worker panicked");
                    true
                }
            },
            Err(xch::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "jog worker did not finish in time, detaching"
                );
                false
            }
        }
    }
}

impl Drop for JogWorker {
    fn drop(&mut self) {
        self.stop(Duration::from_secs(2));
    }
}

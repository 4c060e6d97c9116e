use crate::config::{Config, PollDeadline};
use crate::constants::{EOI, STEP_BUDGET_SECS};
use crate::error::{Jc03Error, Result, Step};
use crate::frame::{FrameError, ResponseFrame};
use crate::transport::Transport;
use crate::types::*;
use log::{debug, error, warn};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// JC03 acquisition engine.
///
/// Holds the position in the [`POLLING_CYCLE`] across polls. The position is
/// only touched through `&mut self`, so one engine serves one device and its
/// polls run one at a time.
#[derive(Debug, Clone)]
pub struct Jc03 {
    position: usize,
    step_budget: Duration,
    poll_deadline: PollDeadline,
}

impl Default for Jc03 {
    fn default() -> Self {
        Self::new()
    }
}

impl Jc03 {
    /// Create an engine with the default step budget and poll deadline
    pub fn new() -> Self {
        Jc03 {
            position: 0,
            step_budget: Duration::from_secs(STEP_BUDGET_SECS),
            poll_deadline: PollDeadline::default(),
        }
    }

    /// Create an engine using the timing of `config`
    pub fn with_config(config: &Config) -> Self {
        Jc03 {
            position: 0,
            step_budget: config.step_budget,
            poll_deadline: config.poll_deadline,
        }
    }

    /// Index into [`POLLING_CYCLE`] of the next request
    pub fn position(&self) -> usize {
        self.position
    }

    /// The request the next attempt will send
    pub fn next_request(&self) -> Option<Request> {
        POLLING_CYCLE.get(self.position).copied()
    }

    /// Poll the BMS once.
    ///
    /// Walks the polling cycle from the current position until a valid
    /// telemetry reply arrives. Returns a complete reading or an error; an
    /// error never carries partial data.
    pub async fn poll_once<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<BatteryReading> {
        match self.poll_deadline.resolve(self.step_budget) {
            Some(deadline) => {
                let outcome = timeout(deadline, self.run_cycle(transport)).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        error!(
                            "Poll deadline of {:?} elapsed at cycle position {}",
                            deadline, self.position
                        );
                        Err(Jc03Error::PollDeadline(deadline))
                    }
                }
            }
            None => self.run_cycle(transport).await,
        }
    }

    async fn run_cycle<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<BatteryReading> {
        loop {
            let Some(request) = self.next_request() else {
                self.position = 0;
                return Err(Jc03Error::CycleExhausted);
            };

            self.send(transport, request).await?;
            let response = self.receive(transport).await?;

            match Self::validate(response.as_deref()) {
                Ok(reading) => {
                    self.position = 0;
                    return Ok(reading);
                }
                Err(e) => {
                    match &e {
                        FrameError::Status(_) => error!("{e}"),
                        _ => warn!("Invalid data format: {e}"),
                    }

                    self.position += 1;
                    if self.position >= POLLING_CYCLE.len() {
                        error!("No valid response in a full polling cycle");
                        self.position = 0;
                        return Err(Jc03Error::CycleExhausted);
                    }
                    sleep(self.step_budget).await;
                }
            }
        }
    }

    /// Write a request within the step budget
    async fn send<T: Transport + ?Sized>(&self, transport: &mut T, request: Request) -> Result<()> {
        let frame = request.frame();
        match timeout(self.step_budget, transport.write_frame(frame)).await {
            Ok(result) => result?,
            Err(_) => {
                error!("Timed out sending {request:?} request");
                return Err(Jc03Error::StepTimeout(Step::Send));
            }
        }
        debug!(
            "Request sent: {}",
            String::from_utf8_lossy(frame).trim_end()
        );
        Ok(())
    }

    /// Read one response within the step budget.
    ///
    /// A read that fails without timing out yields `None`.
    async fn receive<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<Option<Vec<u8>>> {
        match timeout(self.step_budget, transport.read_until(EOI)).await {
            Ok(Ok(buffer)) => {
                debug!(
                    "Response received: {}",
                    String::from_utf8_lossy(&buffer).trim_end()
                );
                Ok(Some(buffer))
            }
            Ok(Err(e)) => {
                error!("Read failed: {e}");
                Ok(None)
            }
            Err(_) => {
                error!("Timed out waiting for a response");
                Err(Jc03Error::StepTimeout(Step::Receive))
            }
        }
    }

    fn validate(response: Option<&[u8]>) -> std::result::Result<BatteryReading, FrameError> {
        let raw = response.ok_or(FrameError::NoResponse)?;
        let frame = ResponseFrame::parse(raw)?;
        debug!(
            "Checksum {:04X} ok, body of {} characters",
            frame.checksum(),
            frame.body().len()
        );
        frame.decode()
    }
}

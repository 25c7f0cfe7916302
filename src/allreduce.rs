//! Pipelined (one-iteration-delayed) non-blocking max-allreduce, standing in
//! for a blocking MPI `Allreduce(MPI_MAX)`: `collect_and_spread` launches
//! the reduction and returns immediately; the caller only pays the wait on
//! the *next* sweep.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::team::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InFlight,
}

struct Shared {
    staged: Vec<Mutex<f64>>,
    completed: RwLock<f64>,
}

/// One unit's handle to a team-wide max-allreduce. Cheap to clone.
#[derive(Clone)]
pub struct AsyncAllreduce {
    team: Team,
    shared: Arc<Shared>,
    state: Arc<Mutex<State>>,
    in_flight: Arc<Mutex<Option<JoinHandle<()>>>>,
}

pub struct ReduceTicket {
    join: JoinHandle<()>,
}

impl AsyncAllreduce {
    pub fn new(team: Team) -> Self {
        let size = team.size();
        let shared = Arc::new(Shared {
            staged: (0..size).map(|_| Mutex::new(f64::MIN)).collect(),
            completed: RwLock::new(f64::MIN),
        });
        Self {
            team,
            shared,
            state: Arc::new(Mutex::new(State::Idle)),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Blocks until any in-flight reduction completes, then resets the
    /// completed value to a sentinel so `get()` cannot be mistaken for a
    /// fresh reduction's result before `collect_and_spread`/`wait` runs.
    pub async fn reset(&self) -> anyhow::Result<()> {
        let prior = self.in_flight.lock().take();
        if let Some(handle) = prior {
            handle.await?;
        }
        *self.shared.completed.write() = f64::MIN;
        *self.state.lock() = State::Idle;
        Ok(())
    }

    /// Stages this unit's local contribution for the next reduction.
    pub fn set(&self, value: f64) {
        *self.shared.staged[self.team.rank()].lock() = value;
    }

    /// Launches the (non-blocking) team-wide max reduction over whatever
    /// every unit has most recently `set`. Rank 0 computes the max inside
    /// a barrier sandwich so every unit's subsequent `get()` sees the same
    /// value only once every unit has reached the second barrier.
    pub fn collect_and_spread(&self) -> ReduceTicket {
        *self.state.lock() = State::InFlight;
        let team = self.team.clone();
        let shared = self.shared.clone();
        let join = tokio::spawn(async move {
            team.barrier().await;
            if team.rank() == 0 {
                let max = shared
                    .staged
                    .iter()
                    .map(|m| *m.lock())
                    .fold(f64::MIN, f64::max);
                *shared.completed.write() = max;
            }
            team.barrier().await;
        });
        ReduceTicket { join }
    }

    /// Same as `collect_and_spread` but remembers the handle so the next
    /// `reset` blocks on it automatically: reduce on sweep N, `wait`/`get`
    /// on sweep N+1.
    pub fn collect_and_spread_pipelined(&self) {
        let ticket = self.collect_and_spread();
        *self.in_flight.lock() = Some(ticket.join);
    }

    pub async fn wait(&self, ticket: ReduceTicket) -> anyhow::Result<()> {
        ticket.join.await?;
        *self.state.lock() = State::Idle;
        Ok(())
    }

    pub fn get(&self) -> f64 {
        *self.shared.completed.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_unit_max_is_identity() {
        tokio_test::block_on(async {
            let teams = Team::all(1);
            let ar = AsyncAllreduce::new(teams[0].clone());
            ar.reset().await.unwrap();
            ar.set(3.5);
            let ticket = ar.collect_and_spread();
            ar.wait(ticket).await.unwrap();
            assert_eq!(ar.get(), 3.5);
        });
    }

    #[tokio::test]
    async fn multi_unit_reduction_picks_max() {
        let teams = Team::all(4);
        let ars: Vec<_> = teams.iter().cloned().map(AsyncAllreduce::new).collect();
        for ar in &ars {
            ar.reset().await.unwrap();
        }
        for (i, ar) in ars.iter().enumerate() {
            ar.set(i as f64);
        }
        let handles: Vec<_> = ars.iter().map(|ar| ar.collect_and_spread()).collect();
        for (ar, ticket) in ars.iter().zip(handles) {
            ar.wait(ticket).await.unwrap();
        }
        for ar in &ars {
            assert_eq!(ar.get(), 3.0);
        }
    }
}

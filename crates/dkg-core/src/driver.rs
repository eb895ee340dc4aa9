//! Message-handler drivers wrapping a DKG or TBLS instance behind a single
//! mutex, per §4.6/§5: handlers are short critical sections, no I/O happens
//! under the lock, and a one-shot completion callback fires exactly once.

use crate::{
    net::{DkgMessage, Envelope, Network, TblsMessage},
    primitives::{
        group::Group,
        state_machine::{DkgActor, Phase},
        types::{BundledJustification, BundledResponses, DKGOutput},
        DKGError, RunId,
    },
};
use parking_lot::Mutex;
use rand_core::RngCore;
use std::{
    collections::HashSet,
    time::{Duration, Instant},
};
use threshold_bls::{
    group::{Curve, PairingCurve},
    poly::{Idx, Poly},
    sig::tbls::{self, SigShare, ThresholdError},
};
use tracing::{error, info, warn};

type Completion<T> = Box<dyn FnOnce(T) + Send>;

/// Drives a single DKG run (C4) to completion or failure.
pub struct DkgDriver<C: Curve, N> {
    run_id: RunId,
    deadline: Instant,
    network: N,
    state: Mutex<DriverState<C>>,
}

struct DriverState<C: Curve> {
    actor: DkgActor<C>,
    dealers_seen: HashSet<Idx>,
    responders_seen: HashSet<Idx>,
    justifiers_seen: HashSet<Idx>,
    group_len: usize,
    on_complete: Option<Completion<Result<DKGOutput<C>, DKGError>>>,
}

impl<C, N> DkgDriver<C, N>
where
    C: Curve,
    N: Network<DkgMessage<C>>,
{
    /// Starts a new DKG run: generates this node's own deal and broadcasts
    /// it immediately (the progress rule of §4.3 - this driver is always its
    /// own "starter").
    pub fn new<R: RngCore>(
        own_private: C::Scalar,
        group: Group<C>,
        run_id: RunId,
        run_deadline: Duration,
        network: N,
        on_complete: impl FnOnce(Result<DKGOutput<C>, DKGError>) + Send + 'static,
        rng: &mut R,
    ) -> Result<Self, DKGError> {
        let group_len = group.len();
        let (actor, own_deal) = DkgActor::new(own_private, group, rng)?;
        let own_idx = actor.own_index();

        let mut dealers_seen = HashSet::new();
        dealers_seen.insert(own_idx);

        let driver = Self {
            run_id,
            deadline: Instant::now() + run_deadline,
            network,
            state: Mutex::new(DriverState {
                actor,
                dealers_seen,
                responders_seen: HashSet::new(),
                justifiers_seen: HashSet::new(),
                group_len,
                on_complete: Some(Box::new(on_complete)),
            }),
        };

        driver
            .network
            .broadcast(Envelope::new(run_id, own_idx, DkgMessage::Deal(own_deal)));

        Ok(driver)
    }

    /// Handles one incoming message. Messages for a different run are
    /// dropped with a warning; this driver only ever speaks for `run_id`.
    pub fn handle_message(&self, envelope: Envelope<DkgMessage<C>>) {
        if envelope.run_id != self.run_id {
            warn!(run = ?envelope.run_id, expected = ?self.run_id, "dropping message for foreign run");
            return;
        }

        let mut state = self.state.lock();
        if state.on_complete.is_none() {
            return;
        }
        self.record(&mut state, envelope);
        self.drain(state);
    }

    /// Checks the run deadline. Call this periodically from outside (the
    /// driver itself runs no timer thread); a no-op until `run_deadline` has
    /// actually elapsed.
    pub fn poll_deadline(&self) {
        if Instant::now() < self.deadline {
            return;
        }
        self.force_advance();
    }

    /// Forces whatever phase the instance is in to conclude with what it has
    /// collected so far, bypassing the run deadline: Dealing/Responding/
    /// Justifying all advance unconditionally, landing on Certified or, if
    /// too few dealers qualified, Failed. Used by [`Self::poll_deadline`]
    /// once the deadline has elapsed, and directly by callers that already
    /// know by some other means (e.g. a higher-level timeout) that no more
    /// messages are coming.
    pub fn force_advance(&self) {
        let state = self.state.lock();
        if state.on_complete.is_none() {
            return;
        }
        self.drain_forced(state);
    }

    fn record(&self, state: &mut DriverState<C>, envelope: Envelope<DkgMessage<C>>) {
        let from = envelope.from;
        match envelope.body {
            DkgMessage::Deal(bundle) => {
                state.dealers_seen.insert(from);
                state.actor.handle_deal(bundle);
            }
            DkgMessage::Response(bundle) => {
                state.responders_seen.insert(from);
                state.actor.handle_response(bundle);
            }
            DkgMessage::Justification(bundle) => {
                state.justifiers_seen.insert(from);
                state.actor.handle_justification(bundle);
            }
        }
    }

    fn drain(&self, state: parking_lot::MutexGuard<DriverState<C>>) {
        self.advance(state, false)
    }

    fn drain_forced(&self, state: parking_lot::MutexGuard<DriverState<C>>) {
        self.advance(state, true)
    }

    /// Pushes the instance through as many phase transitions as are ready,
    /// broadcasting each stage's output before checking the next. `force`
    /// treats every outstanding quorum as satisfied, for deadline handling.
    fn advance(&self, mut state: parking_lot::MutexGuard<DriverState<C>>, force: bool) {
        let own_idx = state.actor.own_index();
        let mut outbound = Vec::new();

        loop {
            match state.actor.phase() {
                Phase::Dealing if force || state.dealers_seen.len() >= state.group_len => {
                    let response = state.actor.finalize_dealing().unwrap_or(BundledResponses {
                        share_idx: own_idx,
                        responses: Vec::new(),
                    });
                    outbound.push(DkgMessage::Response(response));
                }
                Phase::Responding if force || state.responders_seen.len() >= state.group_len => {
                    let justification =
                        state.actor.finalize_responses().unwrap_or(BundledJustification {
                            dealer_idx: own_idx,
                            justifications: Vec::new(),
                            public: state.actor.public_poly().clone(),
                        });
                    outbound.push(DkgMessage::Justification(justification));
                }
                Phase::Justifying if force || state.justifiers_seen.len() >= state.group_len => {
                    let result = state.actor.finalize_justifications().cloned();
                    match &result {
                        Ok(output) => info!(qualified = output.qualified.len(), "DKG run certified"),
                        Err(err) => error!(%err, "DKG run failed to certify"),
                    }
                    if let Some(cb) = state.on_complete.take() {
                        drop(state);
                        for msg in outbound {
                            self.network.broadcast(Envelope::new(self.run_id, own_idx, msg));
                        }
                        cb(result);
                        return;
                    }
                    break;
                }
                _ => break,
            }
        }

        drop(state);
        for msg in outbound {
            self.network.broadcast(Envelope::new(self.run_id, own_idx, msg));
        }
    }
}

/// Drives a single TBLS signing round (C6) to completion or failure.
pub struct TblsDriver<C: PairingCurve, N> {
    run_id: RunId,
    threshold: usize,
    public: Poly<C::G2>,
    deadline: Instant,
    network: N,
    state: Mutex<TblsState<C>>,
}

struct TblsState<C: PairingCurve> {
    message: Option<Vec<u8>>,
    shares: std::collections::BTreeMap<Idx, SigShare<C>>,
    on_complete: Option<Completion<Result<C::G1, ThresholdError>>>,
}

impl<C, N> TblsDriver<C, N>
where
    C: PairingCurve,
    N: Network<TblsMessage<C>>,
{
    pub fn new(
        run_id: RunId,
        threshold: usize,
        public: Poly<C::G2>,
        run_deadline: Duration,
        network: N,
        on_complete: impl FnOnce(Result<C::G1, ThresholdError>) + Send + 'static,
    ) -> Self {
        Self {
            run_id,
            threshold,
            public,
            deadline: Instant::now() + run_deadline,
            network,
            state: Mutex::new(TblsState {
                message: None,
                shares: std::collections::BTreeMap::new(),
                on_complete: Some(Box::new(on_complete)),
            }),
        }
    }

    /// Starts a signing round on `msg`, computing and broadcasting this
    /// node's own share signature.
    pub fn start<R: RngCore>(&self, share: &tbls::Share<C::Scalar>, msg: &[u8], rng: &mut R) {
        {
            let mut state = self.state.lock();
            state.message = Some(msg.to_vec());
        }
        self.network.broadcast(Envelope::new(
            self.run_id,
            share.index,
            TblsMessage::SignRequest(msg.to_vec()),
        ));
        match tbls::partial_sign::<C, _>(share, &self.public, msg, rng) {
            Ok(sig) => self.handle_message(Envelope::new(
                self.run_id,
                share.index,
                TblsMessage::ShareSignature(sig),
            )),
            Err(err) => error!(%err, "failed to produce own signature share"),
        }
    }

    pub fn handle_message(&self, envelope: Envelope<TblsMessage<C>>) {
        if envelope.run_id != self.run_id {
            warn!(run = ?envelope.run_id, expected = ?self.run_id, "dropping message for foreign run");
            return;
        }

        match envelope.body {
            TblsMessage::SignRequest(msg) => {
                let mut state = self.state.lock();
                state.message.get_or_insert(msg);
            }
            TblsMessage::ShareSignature(share) => {
                let msg = {
                    let state = self.state.lock();
                    state.message.clone()
                };
                let msg = match msg {
                    Some(m) => m,
                    None => {
                        warn!(index = share.index, "buffering share signature with no known message yet");
                        return;
                    }
                };

                if tbls::partial_verify::<C>(&self.public, &msg, &share).is_err() {
                    warn!(index = share.index, "discarding invalid share signature");
                    return;
                }

                let mut state = self.state.lock();
                state.shares.insert(share.index, share);
            }
        }

        self.maybe_finish();
    }

    pub fn poll_deadline(&self) {
        if Instant::now() < self.deadline {
            return;
        }
        let mut state = self.state.lock();
        if let Some(cb) = state.on_complete.take() {
            error!("TBLS run timed out with insufficient shares");
            let have = state.shares.len();
            let need = self.threshold;
            drop(state);
            cb(Err(ThresholdError::InsufficientShares(have, need)));
        }
    }

    fn maybe_finish(&self) {
        let mut state = self.state.lock();
        if state.on_complete.is_none() || state.shares.len() < self.threshold {
            return;
        }

        // Deterministic, reproducible selection: lowest `threshold` indices.
        let chosen: Vec<_> = state.shares.values().take(self.threshold).cloned().collect();
        let result = tbls::aggregate::<C>(self.threshold, &chosen);
        match &result {
            Ok(_) => info!(shares = chosen.len(), "TBLS round aggregated"),
            Err(err) => error!(%err, "TBLS aggregation failed"),
        }

        if let Some(cb) = state.on_complete.take() {
            drop(state);
            cb(result);
        }
    }
}

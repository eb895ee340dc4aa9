//! A message-driven, reentrant implementation of a Pedersen/Feldman-style
//! joint-verifiable secret sharing DKG.
//!
//! Unlike a batch protocol that consumes an entire phase's messages at once,
//! a [`DkgActor`] accepts one message at a time, in whatever order it
//! arrives, and buffers anything that arrives ahead of the phase it belongs
//! to. A driver (see [`crate::driver`]) decides *when* to ask the actor to
//! close out a phase - typically on a quorum condition or a deadline - via
//! the `finalize_*` methods; the `handle_*` methods are safe to call at any
//! time and are idempotent with respect to duplicate messages.

use crate::primitives::{
    group::Group,
    status::{Status, StatusMatrix},
    types::{
        BundledJustification, BundledResponses, BundledShares, DKGOutput, EncryptedShare,
        Justification, Response,
    },
    DKGError, DKGResult, ShareError,
};
use rand_core::RngCore;
use std::collections::{BTreeMap, HashMap};
use threshold_bls::{
    ecies,
    group::{Curve, Element},
    poly::{Idx, PrivatePoly, PublicPoly},
    sig::tbls,
};
use tracing::{debug, warn};

type ShareInfo<C> = HashMap<Idx, <C as Curve>::Scalar>;
type PublicInfo<C> = HashMap<Idx, PublicPoly<C>>;

/// The phase a [`DkgActor`] is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Dealing,
    Responding,
    Justifying,
    Certified,
    Failed,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Dealing => "dealing",
            Phase::Responding => "responding",
            Phase::Justifying => "justifying",
            Phase::Certified => "certified",
            Phase::Failed => "failed",
        }
    }
}

/// Checks that the commitment to `share` corresponds to `public`'s
/// evaluation at `idx`.
fn share_correct<C: Curve>(idx: Idx, share: &C::Scalar, public: &PublicPoly<C>) -> bool {
    let mut commit = C::Point::one();
    commit.mul(share);
    public.eval(idx).value == commit
}

/// Decrypts and checks a single encrypted share against the dealer's public
/// commitment.
fn decrypt_and_check_share<C: Curve>(
    private_key: &C::Scalar,
    dealer_idx: Idx,
    public: &PublicPoly<C>,
    share: &EncryptedShare<C>,
) -> Result<C::Scalar, ShareError> {
    let buff = ecies::decrypt::<C>(private_key, &share.secret)
        .map_err(|err| ShareError::InvalidCiphertext(dealer_idx, err))?;
    let clear_share: C::Scalar =
        bincode::deserialize(&buff).map_err(|_| ShareError::InvalidShare(dealer_idx))?;

    if !share_correct::<C>(share.share_idx, &clear_share, public) {
        return Err(ShareError::InvalidShare(dealer_idx));
    }
    Ok(clear_share)
}

/// Encrypts `secret`'s evaluation at each node in `group` and bundles the
/// result alongside the public commitment.
fn create_share_bundle<C: Curve, R: RngCore>(
    dealer_idx: Idx,
    secret: &PrivatePoly<C>,
    public: &PublicPoly<C>,
    group: &Group<C>,
    rng: &mut R,
) -> DKGResult<BundledShares<C>> {
    let shares = group
        .nodes
        .iter()
        .map(|n| {
            let sec = secret.eval(n.id() as Idx);
            let buff = bincode::serialize(&sec.value)?;
            let cipher = ecies::encrypt::<C, _>(n.key(), &buff, rng);
            Ok(EncryptedShare {
                share_idx: n.id(),
                secret: cipher,
            })
        })
        .collect::<Result<Vec<_>, DKGError>>()?;

    Ok(BundledShares {
        dealer_idx,
        shares,
        public: public.clone(),
    })
}

/// A running (or finished) instance of the DKG protocol, from the point of
/// view of a single participant.
pub struct DkgActor<C: Curve> {
    own_idx: Idx,
    own_private: C::Scalar,
    group: Group<C>,
    threshold: usize,
    secret: PrivatePoly<C>,
    public: PublicPoly<C>,
    phase: Phase,
    deals: BTreeMap<Idx, BundledShares<C>>,
    my_shares: ShareInfo<C>,
    publics: PublicInfo<C>,
    statuses: StatusMatrix,
    buffered_responses: Vec<BundledResponses>,
    buffered_justifications: Vec<BundledJustification<C>>,
    output: Option<DKGOutput<C>>,
}

impl<C: Curve> DkgActor<C> {
    /// Starts a new DKG instance, generating this node's own secret
    /// polynomial and dealing it to itself. Returns the bundle that should
    /// be broadcast to the rest of the group.
    pub fn new<R: RngCore>(
        own_private: C::Scalar,
        group: Group<C>,
        rng: &mut R,
    ) -> DKGResult<(Self, BundledShares<C>)> {
        let mut own_public = C::Point::one();
        own_public.mul(&own_private);

        let own_idx = group
            .index(&own_public)
            .ok_or(DKGError::PublicKeyNotFound)?;

        let threshold = group.threshold;
        let secret = PrivatePoly::<C>::new(threshold - 1);
        let public = secret.commit::<C::Point>();

        let bundle = create_share_bundle(own_idx, &secret, &public, &group, rng)?;

        let mut statuses = StatusMatrix::new(group.len(), group.len(), Status::Success);
        (0..group.len())
            .filter(|&d| d as Idx != own_idx)
            .for_each(|d| statuses.set(d as Idx, own_idx, Status::Complaint));

        let mut my_shares = ShareInfo::<C>::new();
        my_shares.insert(own_idx, secret.eval(own_idx).value);
        let mut publics = PublicInfo::<C>::new();
        publics.insert(own_idx, public.clone());

        let actor = Self {
            own_idx,
            own_private,
            group,
            threshold,
            secret,
            public,
            phase: Phase::Dealing,
            deals: BTreeMap::new(),
            my_shares,
            publics,
            statuses,
            buffered_responses: Vec::new(),
            buffered_justifications: Vec::new(),
            output: None,
        };

        Ok((actor, bundle))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn own_index(&self) -> Idx {
        self.own_idx
    }

    /// This node's own commitment to its dealt secret polynomial.
    pub fn public_poly(&self) -> &PublicPoly<C> {
        &self.public
    }

    /// Handles an incoming deal from another dealer. Safe to call multiple
    /// times with the same bundle; duplicates and deals from unknown dealers
    /// are ignored.
    pub fn handle_deal(&mut self, bundle: BundledShares<C>) {
        if self.phase != Phase::Dealing {
            debug!(dealer = bundle.dealer_idx, phase = self.phase.name(), "ignoring late deal");
            return;
        }
        if !self.group.contains_index(bundle.dealer_idx) {
            warn!(dealer = bundle.dealer_idx, "deal from unknown dealer index");
            return;
        }
        if bundle.public.degree() != self.threshold - 1 {
            warn!(dealer = bundle.dealer_idx, "deal with wrong commitment degree");
            return;
        }
        self.deals.entry(bundle.dealer_idx).or_insert(bundle);
    }

    /// Closes the dealing phase: decrypts and checks every buffered deal,
    /// producing this node's complaint bundle (if any) for the responding
    /// phase. A no-op returning `None` if dealing has already closed.
    pub fn finalize_dealing(&mut self) -> Option<BundledResponses> {
        if self.phase != Phase::Dealing {
            return None;
        }

        for (&dealer_idx, bundle) in self.deals.iter() {
            if dealer_idx == self.own_idx {
                continue;
            }
            self.publics.insert(dealer_idx, bundle.public.clone());

            let encrypted = match bundle.shares.iter().find(|s| s.share_idx == self.own_idx) {
                Some(s) => s,
                None => continue,
            };

            match decrypt_and_check_share::<C>(&self.own_private, dealer_idx, &bundle.public, encrypted)
            {
                Ok(share) => {
                    self.statuses.set(dealer_idx, self.own_idx, Status::Success);
                    self.my_shares.insert(dealer_idx, share);
                }
                Err(err) => {
                    warn!(dealer = dealer_idx, error = %err, "share failed verification");
                }
            }
        }

        self.phase = Phase::Responding;

        let response = compute_bundle_response(self.own_idx, &self.statuses);

        let buffered = std::mem::take(&mut self.buffered_responses);
        for bundle in buffered {
            self.apply_response(bundle);
        }

        response
    }

    /// Handles an incoming response/complaint bundle. Arriving before
    /// dealing has closed out is buffered rather than dropped.
    pub fn handle_response(&mut self, bundle: BundledResponses) {
        if self.phase == Phase::Dealing {
            debug!(holder = bundle.share_idx, "buffering early response");
            self.buffered_responses.push(bundle);
            return;
        }
        if self.phase != Phase::Responding {
            debug!(holder = bundle.share_idx, phase = self.phase.name(), "ignoring late response");
            return;
        }
        self.apply_response(bundle);
    }

    fn apply_response(&mut self, bundle: BundledResponses) {
        if bundle.share_idx == self.own_idx || !self.group.contains_index(bundle.share_idx) {
            return;
        }
        if bundle
            .responses
            .iter()
            .any(|r| !self.group.contains_index(r.dealer_idx))
        {
            warn!(holder = bundle.share_idx, "response references unknown dealer");
            return;
        }
        for response in &bundle.responses {
            self.statuses
                .set(response.dealer_idx, bundle.share_idx, response.status);
        }
    }

    /// Closes the responding phase. If this node's own deal attracted
    /// complaints, returns the justification bundle that must be broadcast.
    pub fn finalize_responses(&mut self) -> Option<BundledJustification<C>> {
        if self.phase != Phase::Responding {
            return None;
        }

        self.phase = Phase::Justifying;

        let buffered = std::mem::take(&mut self.buffered_justifications);
        for bundle in buffered {
            self.apply_justification(bundle);
        }

        get_justification::<C>(self.own_idx, &self.secret, &self.public, &self.statuses)
    }

    /// Handles an incoming justification. Arriving before the justifying
    /// phase has opened is buffered rather than dropped.
    pub fn handle_justification(&mut self, bundle: BundledJustification<C>) {
        if self.phase == Phase::Dealing || self.phase == Phase::Responding {
            self.buffered_justifications.push(bundle);
            return;
        }
        if self.phase != Phase::Justifying {
            debug!(dealer = bundle.dealer_idx, phase = self.phase.name(), "ignoring late justification");
            return;
        }
        self.apply_justification(bundle);
    }

    fn apply_justification(&mut self, bundle: BundledJustification<C>) {
        if !self.group.contains_index(bundle.dealer_idx) {
            return;
        }
        let public = match self.publics.get(&bundle.dealer_idx) {
            Some(p) => p,
            None => return,
        };
        for justification in &bundle.justifications {
            if share_correct::<C>(justification.share_idx, &justification.share, public) {
                self.statuses
                    .set(bundle.dealer_idx, justification.share_idx, Status::Success);
                if self.own_idx == justification.share_idx {
                    self.my_shares
                        .insert(bundle.dealer_idx, justification.share.clone());
                }
            } else {
                warn!(
                    dealer = bundle.dealer_idx,
                    holder = justification.share_idx,
                    "justification did not match public commitment"
                );
            }
        }
    }

    /// Closes the justifying phase and computes this node's final output:
    /// the sum of the shares and public commitments of every dealer whose
    /// row in the status matrix is now fully resolved, provided at least
    /// `threshold` dealers qualify.
    pub fn finalize_justifications(&mut self) -> DKGResult<&DKGOutput<C>> {
        if self.phase == Phase::Certified {
            return Ok(self.output.as_ref().expect("certified implies output set"));
        }
        if self.phase != Phase::Justifying {
            return Err(DKGError::Finished(self.phase.name()));
        }

        let qualified: Vec<Idx> = (0..self.group.len() as Idx)
            .filter(|&d| self.statuses.all_true(d) && self.my_shares.contains_key(&d))
            .collect();

        if qualified.len() < self.threshold {
            self.phase = Phase::Failed;
            return Err(DKGError::InsufficientQualified(qualified.len(), self.threshold));
        }

        let mut final_private = C::Scalar::zero();
        let mut final_public = PublicPoly::<C>::zero();
        for d in &qualified {
            final_private.add(&self.my_shares[d]);
            final_public.add(&self.publics[d]);
        }

        let output = DKGOutput {
            share: tbls::Share {
                index: self.own_idx,
                private: final_private,
            },
            public: final_public,
            qualified,
        };

        self.phase = Phase::Certified;
        self.output = Some(output);
        Ok(self.output.as_ref().expect("just set"))
    }
}

/// Computes the response bundle for `holder_idx`, reporting only complaints
/// (dealers for whom the holder's status is not `Success`), per the
/// "optimistic" broadcast convention: a dealer is assumed correct unless
/// told otherwise.
fn compute_bundle_response(holder_idx: Idx, statuses: &StatusMatrix) -> Option<BundledResponses> {
    let responses = statuses
        .get_for_share(holder_idx)
        .into_iter()
        .enumerate()
        .map(|(i, b)| Response {
            dealer_idx: i as Idx,
            status: Status::from(b),
        })
        .filter(|r| !r.status.is_success())
        .collect::<Vec<_>>();

    if responses.is_empty() {
        None
    } else {
        Some(BundledResponses {
            responses,
            share_idx: holder_idx,
        })
    }
}

/// Builds the justification bundle revealing shares for any holder who
/// complained about `dealer_idx`'s deal, or `None` if there were no
/// complaints.
fn get_justification<C: Curve>(
    dealer_idx: Idx,
    secret: &PrivatePoly<C>,
    public: &PublicPoly<C>,
    statuses: &StatusMatrix,
) -> Option<BundledJustification<C>> {
    if statuses.all_true(dealer_idx) {
        return None;
    }

    let justifications = statuses
        .get_for_dealer(dealer_idx)
        .iter()
        .enumerate()
        .filter_map(|(i, success)| {
            if *success {
                None
            } else {
                let id = i as Idx;
                Some(Justification {
                    share_idx: id,
                    share: secret.eval(id).value,
                })
            }
        })
        .collect::<Vec<_>>();

    Some(BundledJustification {
        dealer_idx,
        justifications,
        public: public.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::group::Node;
    use rand::thread_rng;
    use threshold_bls::curve::bls12381::G2Curve as Curve;

    fn setup(n: usize, t: usize) -> (Vec<<Curve as threshold_bls::group::Curve>::Scalar>, Group<Curve>) {
        let mut rng = thread_rng();
        let privs: Vec<_> = (0..n)
            .map(|_| <Curve as threshold_bls::group::Curve>::Scalar::rand(&mut rng))
            .collect();
        let nodes = privs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut public = <Curve as threshold_bls::group::Curve>::Point::one();
                public.mul(p);
                Node::new(i as Idx, public)
            })
            .collect();
        let group = Group::new(nodes, t).unwrap();
        (privs, group)
    }

    fn run_full_dkg(n: usize, t: usize) -> Vec<DKGOutput<Curve>> {
        let mut rng = thread_rng();
        let (privs, group) = setup(n, t);

        let mut actors = Vec::new();
        let mut deals = Vec::new();
        for p in &privs {
            let (actor, bundle) = DkgActor::new(p.clone(), group.clone(), &mut rng).unwrap();
            deals.push(bundle);
            actors.push(actor);
        }

        for actor in actors.iter_mut() {
            for deal in &deals {
                actor.handle_deal(deal.clone());
            }
        }

        let mut responses = Vec::new();
        for actor in actors.iter_mut() {
            if let Some(r) = actor.finalize_dealing() {
                responses.push(r);
            }
        }
        for actor in actors.iter_mut() {
            for r in &responses {
                actor.handle_response(r.clone());
            }
        }

        let mut justifications = Vec::new();
        for actor in actors.iter_mut() {
            if let Some(j) = actor.finalize_responses() {
                justifications.push(j);
            }
        }
        for actor in actors.iter_mut() {
            for j in &justifications {
                actor.handle_justification(j.clone());
            }
        }

        actors
            .iter_mut()
            .map(|a| a.finalize_justifications().unwrap().clone())
            .collect()
    }

    #[test]
    fn full_dkg_happy_path() {
        let outputs = run_full_dkg(7, 4);
        let key = outputs[0].public.public_key().clone();
        for o in &outputs {
            assert_eq!(o.public.public_key(), &key);
            assert_eq!(o.qualified.len(), 7);
        }
    }

    #[test]
    fn minimal_group() {
        let outputs = run_full_dkg(3, 2);
        assert_eq!(outputs.len(), 3);
    }

    /// A dealer ships a corrupted share to one holder, the holder complains,
    /// and the dealer's justification reveals a share that still doesn't
    /// match its own public commitment (e.g. a buggy or equivocating
    /// dealer). That dealer must be excluded from the qualified set, while
    /// the rest of the group still certifies since n-1 dealers clear the
    /// threshold.
    #[test]
    fn bad_dealer_with_unfixable_justification_is_excluded() {
        let mut rng = thread_rng();
        let (n, t) = (7, 4);
        let (privs, group) = setup(n, t);
        let bad_dealer = 0 as Idx;
        let victim = 1 as Idx;

        let mut actors = Vec::new();
        let mut deals = Vec::new();
        for p in &privs {
            let (actor, bundle) = DkgActor::new(p.clone(), group.clone(), &mut rng).unwrap();
            deals.push(bundle);
            actors.push(actor);
        }

        // Corrupt the bad dealer's share to the victim: encrypt an unrelated
        // random scalar instead of the polynomial evaluation, so it still
        // decrypts cleanly but fails the public-commitment check.
        let victim_key = group.nodes[victim as usize].key().clone();
        let garbage = <Curve as threshold_bls::group::Curve>::Scalar::rand(&mut rng);
        let garbage_bytes = bincode::serialize(&garbage).unwrap();
        let bad_bundle = &mut deals[bad_dealer as usize];
        for s in bad_bundle.shares.iter_mut() {
            if s.share_idx == victim {
                s.secret = threshold_bls::ecies::encrypt::<Curve, _>(&victim_key, &garbage_bytes, &mut rng);
            }
        }

        for actor in actors.iter_mut() {
            for deal in &deals {
                actor.handle_deal(deal.clone());
            }
        }

        let mut responses = Vec::new();
        for actor in actors.iter_mut() {
            if let Some(r) = actor.finalize_dealing() {
                responses.push(r);
            }
        }
        assert!(responses.iter().any(|r| r.share_idx == victim));

        for actor in actors.iter_mut() {
            for r in &responses {
                actor.handle_response(r.clone());
            }
        }

        // A correctly-behaving dealer's justification always matches its own
        // public commitment, since it's built from the same secret polynomial
        // that produced it - so to model a dealer that *can't* clear the
        // complaint (rather than one that simply forgot), tamper with the
        // bad dealer's justification after it's produced, substituting a
        // share that doesn't match its committed polynomial either.
        let mut justifications = Vec::new();
        for actor in actors.iter_mut() {
            if let Some(mut j) = actor.finalize_responses() {
                if j.dealer_idx == bad_dealer {
                    for just in j.justifications.iter_mut() {
                        if just.share_idx == victim {
                            just.share = <Curve as threshold_bls::group::Curve>::Scalar::rand(&mut rng);
                        }
                    }
                }
                justifications.push(j);
            }
        }
        assert!(justifications.iter().any(|j| j.dealer_idx == bad_dealer));

        for actor in actors.iter_mut() {
            for j in &justifications {
                actor.handle_justification(j.clone());
            }
        }

        let outputs: Vec<_> = actors
            .iter_mut()
            .map(|a| a.finalize_justifications().unwrap().clone())
            .collect();

        for o in &outputs {
            assert_eq!(o.qualified.len(), n - 1);
            assert!(!o.qualified.contains(&bad_dealer));
        }
    }
}

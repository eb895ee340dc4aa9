//! An in-memory [`Network`] test double. Messages are queued rather than
//! delivered synchronously, so a test drives the protocol by repeatedly
//! draining the queue and dispatching to the addressed driver(s) - this
//! keeps the ordering entirely in the test's hands, which is what lets the
//! DKG end-to-end tests exercise out-of-order delivery deliberately.

use crate::net::{Envelope, Network};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use threshold_bls::poly::Idx;

#[derive(Clone)]
pub struct InMemoryNetwork<M> {
    outbox: Arc<Mutex<VecDeque<(Option<Idx>, Envelope<M>)>>>,
}

impl<M> InMemoryNetwork<M> {
    pub fn new() -> Self {
        Self {
            outbox: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Pops the next queued message, if any.
    pub fn next(&self) -> Option<(Option<Idx>, Envelope<M>)> {
        self.outbox.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }
}

impl<M> Default for InMemoryNetwork<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Network<M> for InMemoryNetwork<M> {
    fn send(&self, to: Idx, message: Envelope<M>) {
        self.outbox.lock().push_back((Some(to), message));
    }

    fn broadcast(&self, message: Envelope<M>) {
        self.outbox.lock().push_back((None, message));
    }
}

/// Drains `network`'s queue, dispatching each message to `dispatch` (addressed
/// sends go to one index, broadcasts to every index `0..n`), until the queue
/// runs dry. `dispatch` is expected to internally route to the right driver's
/// `handle_message`.
pub fn pump<M: Clone>(network: &InMemoryNetwork<M>, n: usize, mut dispatch: impl FnMut(usize, Envelope<M>)) {
    while let Some((to, envelope)) = network.next() {
        match to {
            Some(idx) => dispatch(idx as usize, envelope),
            None => {
                for i in 0..n {
                    dispatch(i, envelope.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        driver::DkgDriver,
        net::DkgMessage,
        primitives::{group::Node, types::DKGOutput, DKGError, RunId},
    };
    use parking_lot::Mutex as PLMutex;
    use rand::thread_rng;
    use std::{sync::mpsc, time::Duration};
    use threshold_bls::{
        curve::bls12381::G2Curve as Curve,
        group::{Curve as CurveTrait, Element},
    };

    const RUN: RunId = [7u8; 16];

    fn make_group(
        n: usize,
        t: usize,
    ) -> (
        Vec<<Curve as CurveTrait>::Scalar>,
        crate::primitives::group::Group<Curve>,
    ) {
        let mut rng = thread_rng();
        let privs: Vec<_> = (0..n)
            .map(|_| <Curve as CurveTrait>::Scalar::rand(&mut rng))
            .collect();
        let nodes = privs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut public = <Curve as CurveTrait>::Point::one();
                public.mul(p);
                Node::new(i as Idx, public)
            })
            .collect();
        let group = crate::primitives::group::Group::new(nodes, t).unwrap();
        (privs, group)
    }

    fn spawn_drivers(
        n: usize,
        t: usize,
    ) -> (
        Vec<DkgDriver<Curve, InMemoryNetwork<DkgMessage<Curve>>>>,
        InMemoryNetwork<DkgMessage<Curve>>,
        mpsc::Receiver<Result<DKGOutput<Curve>, DKGError>>,
    ) {
        let (privs, group) = make_group(n, t);
        let network = InMemoryNetwork::<DkgMessage<Curve>>::new();
        let (tx, rx) = mpsc::channel();

        let drivers = privs
            .into_iter()
            .map(|p| {
                let tx = tx.clone();
                DkgDriver::new(
                    p,
                    group.clone(),
                    RUN,
                    Duration::from_secs(30),
                    network.clone(),
                    move |res| tx.send(res).unwrap(),
                    &mut thread_rng(),
                )
                .unwrap()
            })
            .collect();

        (drivers, network, rx)
    }

    #[test]
    fn drivers_certify_over_in_memory_network() {
        let (n, t) = (7, 4);
        let (drivers, network, rx) = spawn_drivers(n, t);
        let drivers = PLMutex::new(drivers);

        pump(&network, n, |i, envelope| {
            drivers.lock()[i].handle_message(envelope);
        });

        let outputs: Vec<_> = (0..n).map(|_| rx.recv().unwrap().unwrap()).collect();
        let key = outputs[0].public.public_key().clone();
        for o in &outputs {
            assert_eq!(o.public.public_key(), &key);
            assert_eq!(o.qualified.len(), n);
        }
    }

    #[test]
    fn dealer_omitting_its_deal_still_certifies() {
        let (n, t) = (7, 4);
        let (drivers, network, rx) = spawn_drivers(n, t);
        let drivers = PLMutex::new(drivers);

        // Drop every deal originating from participant 2 before it is ever
        // dispatched, simulating a dealer that never sends one.
        pump(&network, n, |i, envelope| {
            if let DkgMessage::Deal(ref bundle) = envelope.body {
                if bundle.dealer_idx == 2 {
                    return;
                }
            }
            drivers.lock()[i].handle_message(envelope);
        });

        for d in drivers.lock().iter() {
            d.force_advance();
        }

        let outputs: Vec<_> = (0..n).map(|_| rx.recv().unwrap().unwrap()).collect();
        for o in &outputs {
            assert_eq!(o.qualified.len(), n - 1);
            assert!(!o.qualified.contains(&2));
        }
    }
}

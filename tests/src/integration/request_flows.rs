//! # Request/Response Flows
//!
//! A `ChannelRequester` on the left talks to a `ChannelRequestReceiver` on
//! the right through a real channel pair, with both channel threads running.
//!
//! ## Flows Tested:
//!
//! 1. **Round trip**: payloads and request ids survive both legs untouched
//! 2. **Sync requests**: blocking callers on worker threads
//! 3. **Out-of-order completion**: responses matched by id only
//! 4. **Teardown**: detach and drop fail every outstanding request
//! 5. **Cancellation**: local, and late responses are dropped

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{wait_until, Link, WAIT};
    use cr_01_requesting::{
        ChannelRequestReceiver, ChannelRequester, RequestId, RequestMessageData, RequestReceiver,
        RequestResult, Requester, ResponseMessageData, ResultCallback, REQUESTER_DESTROYED_MESSAGE,
        REQUESTER_DETACHED_MESSAGE,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use shared_bus::BlockingToken;
    use shared_types::Payload;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Parked = Arc<Mutex<Vec<(Payload, ResultCallback)>>>;

    fn results_channel() -> (
        mpsc::Sender<RequestResult<Payload>>,
        mpsc::Receiver<RequestResult<Payload>>,
    ) {
        mpsc::channel()
    }

    fn callback_into(
        tx: &mpsc::Sender<RequestResult<Payload>>,
    ) -> Box<dyn FnOnce(RequestResult<Payload>) + Send> {
        let tx = tx.clone();
        Box::new(move |result| {
            let _ = tx.send(result);
        })
    }

    /// Receiver that answers every request with `{"echo": payload}`.
    fn echo_receiver(link: &Link) -> Arc<ChannelRequestReceiver> {
        ChannelRequestReceiver::new(
            "svc",
            |payload: Payload, callback: ResultCallback| {
                callback.send(RequestResult::succeeded(json!({ "echo": payload })));
            },
            link.right.channel.clone(),
            link.right.router.clone(),
        )
    }

    /// Receiver that keeps every callback for the test to answer later.
    fn parking_receiver(link: &Link) -> (Arc<ChannelRequestReceiver>, Parked) {
        let parked: Parked = Arc::new(Mutex::new(Vec::new()));
        let sink = parked.clone();
        let receiver = ChannelRequestReceiver::new(
            "svc",
            move |payload: Payload, callback: ResultCallback| sink.lock().push((payload, callback)),
            link.right.channel.clone(),
            link.right.router.clone(),
        );
        (receiver, parked)
    }

    fn requester(link: &Link) -> Arc<ChannelRequester> {
        ChannelRequester::new("svc", link.left.channel.clone(), link.left.router.clone())
    }

    // =============================================================================
    // ROUND TRIP
    // =============================================================================

    #[test]
    fn test_ping_pong_round_trip() {
        let link = Link::new();
        let _receiver = ChannelRequestReceiver::new(
            "svc",
            |payload: Payload, callback: ResultCallback| {
                assert_eq!(payload, json!({"op": "ping"}));
                callback.send(RequestResult::succeeded(json!({"op": "pong"})));
            },
            link.right.channel.clone(),
            link.right.router.clone(),
        );
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        requester.start_async_request(json!({"op": "ping"}), callback_into(&tx));

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Succeeded(json!({"op": "pong"}))
        );

        let requests = link.left.channel.sent();
        let responses = link.right.channel.sent();
        assert_eq!(requests.len(), 1);
        assert_eq!(responses.len(), 1);
        assert_eq!(requests[0].message_type, "svc::request");
        assert_eq!(responses[0].message_type, "svc::response");

        let request = RequestMessageData::from_value(requests[0].data.clone()).unwrap();
        let response = ResponseMessageData::from_value(responses[0].data.clone()).unwrap();
        assert_eq!(request.request_id, RequestId::new(0));
        assert_eq!(request.request_id, response.request_id);
        assert_eq!(requester.pending_count(), 0);
    }

    #[test]
    fn test_failure_reaches_requester() {
        let link = Link::new();
        let _receiver = ChannelRequestReceiver::new(
            "svc",
            |_: Payload, callback: ResultCallback| {
                callback.send(RequestResult::failed("card removed"));
            },
            link.right.channel.clone(),
            link.right.router.clone(),
        );
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        requester.start_async_request(json!(null), callback_into(&tx));

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Failed("card removed".to_string())
        );
    }

    #[test]
    fn test_payload_survives_unchanged() {
        let link = Link::new();
        let _receiver = echo_receiver(&link);
        let requester = requester(&link);
        let payload = json!({
            "nested": {"list": [1, 2.5, -3, "x", null, true]},
            "bytes": [0, 255, 16],
            "empty": {},
        });

        let (tx, rx) = results_channel();
        requester.start_async_request(payload.clone(), callback_into(&tx));

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Succeeded(json!({ "echo": payload }))
        );
    }

    // =============================================================================
    // SYNC REQUESTS
    // =============================================================================

    #[test]
    fn test_sync_requests_from_worker_threads() {
        let link = Link::new();
        let _receiver = echo_receiver(&link);
        let requester = requester(&link);

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let requester = requester.clone();
                thread::spawn(move || {
                    let token = BlockingToken::acquire().expect("worker is not a channel thread");
                    requester.perform_sync_request(json!(i), &token)
                })
            })
            .collect();

        for (i, worker) in workers.into_iter().enumerate() {
            assert_eq!(
                worker.join().unwrap(),
                RequestResult::Succeeded(json!({ "echo": i }))
            );
        }
        assert_eq!(requester.stats().responses_matched.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_channel_thread_cannot_block() {
        let link = Link::new();
        let _receiver = ChannelRequestReceiver::new(
            "svc",
            |_: Payload, callback: ResultCallback| {
                let refused = BlockingToken::acquire().is_none();
                callback.send(RequestResult::succeeded(json!(refused)));
            },
            link.right.channel.clone(),
            link.right.router.clone(),
        );
        let requester = requester(&link);
        let token = BlockingToken::acquire().unwrap();

        assert_eq!(
            requester.perform_sync_request(json!(null), &token),
            RequestResult::Succeeded(json!(true))
        );
    }

    #[test]
    fn test_detach_releases_blocked_caller() {
        let link = Link::new();
        let (_receiver, parked) = parking_receiver(&link);
        let requester = requester(&link);

        let waiter = {
            let requester = requester.clone();
            thread::spawn(move || {
                let token = BlockingToken::acquire().unwrap();
                requester.perform_sync_request(json!("stuck"), &token)
            })
        };
        assert!(wait_until(WAIT, || parked.lock().len() == 1));

        requester.detach();
        assert_eq!(
            waiter.join().unwrap(),
            RequestResult::Failed(REQUESTER_DETACHED_MESSAGE.to_string())
        );
    }

    // =============================================================================
    // OUT-OF-ORDER COMPLETION
    // =============================================================================

    #[test]
    fn test_responses_matched_by_id_not_order() {
        let link = Link::new();
        let (_receiver, parked) = parking_receiver(&link);
        let requester = requester(&link);

        let receivers: Vec<_> = (0..5)
            .map(|i| {
                let (tx, rx) = results_channel();
                requester.start_async_request(json!(i), callback_into(&tx));
                rx
            })
            .collect();
        assert!(wait_until(WAIT, || parked.lock().len() == 5));

        let answered: Vec<_> = parked.lock().drain(..).collect();
        let answerer = thread::spawn(move || {
            for (payload, callback) in answered.into_iter().rev() {
                callback.send(RequestResult::succeeded(json!({ "answer": payload })));
            }
        });
        answerer.join().unwrap();

        for (i, rx) in receivers.into_iter().enumerate() {
            assert_eq!(
                rx.recv_timeout(WAIT).unwrap(),
                RequestResult::Succeeded(json!({ "answer": i }))
            );
        }
    }

    #[test]
    fn test_callback_may_start_next_request() {
        let link = Link::new();
        let _receiver = echo_receiver(&link);
        let requester = requester(&link);
        let (tx, rx) = results_channel();

        let chained = requester.clone();
        let chained_tx = tx.clone();
        requester.start_async_request(
            json!(1),
            Box::new(move |first| {
                let _ = chained_tx.send(first);
                chained.start_async_request(json!(2), callback_into(&chained_tx));
            }),
        );

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Succeeded(json!({"echo": 1}))
        );
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Succeeded(json!({"echo": 2}))
        );
    }

    // =============================================================================
    // TEARDOWN
    // =============================================================================

    #[test]
    fn test_drop_fails_outstanding_requests() {
        let link = Link::new();
        let (_receiver, parked) = parking_receiver(&link);
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        for i in 0..4 {
            requester.start_async_request(json!(i), callback_into(&tx));
        }
        assert!(wait_until(WAIT, || parked.lock().len() == 4));
        assert_eq!(requester.pending_count(), 4);

        drop(requester);
        for _ in 0..4 {
            assert_eq!(
                rx.recv_timeout(WAIT).unwrap(),
                RequestResult::Failed(REQUESTER_DESTROYED_MESSAGE.to_string())
            );
        }
        assert!(!link.left.router.has_route("svc::response"));

        // Answers arriving after teardown hit a routing miss and are dropped.
        for (_, callback) in parked.lock().drain(..) {
            callback.send(RequestResult::succeeded(json!("late")));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_requests_after_detach_fail_fast() {
        let link = Link::new();
        let _receiver = echo_receiver(&link);
        let requester = requester(&link);
        requester.detach();

        let token = BlockingToken::acquire().unwrap();
        assert_eq!(
            requester.perform_sync_request(json!(1), &token),
            RequestResult::Failed(REQUESTER_DETACHED_MESSAGE.to_string())
        );
        assert!(link.left.channel.sent().is_empty());
        assert_eq!(requester.stats().send_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_receiver_detach_discards_answers() {
        let link = Link::new();
        let (receiver, parked) = parking_receiver(&link);
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        let request = requester.start_async_request(json!(1), callback_into(&tx));
        assert!(wait_until(WAIT, || parked.lock().len() == 1));

        receiver.detach();
        for (_, callback) in parked.lock().drain(..) {
            callback.send(RequestResult::succeeded(json!("lost")));
        }
        assert!(link.right.channel.sent().is_empty());

        // Nothing arrives, so the caller withdraws the request.
        assert!(request.cancel());
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), RequestResult::Canceled);
    }

    // =============================================================================
    // CANCELLATION
    // =============================================================================

    #[test]
    fn test_cancel_then_late_response_is_dropped() {
        let link = Link::new();
        let (_receiver, parked) = parking_receiver(&link);
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        let request = requester.start_async_request(json!("slow"), callback_into(&tx));
        assert!(wait_until(WAIT, || parked.lock().len() == 1));

        assert!(request.cancel());
        assert!(!request.cancel());
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), RequestResult::Canceled);

        for (_, callback) in parked.lock().drain(..) {
            callback.send(RequestResult::succeeded(json!("too late")));
        }
        assert!(wait_until(WAIT, || {
            requester.stats().responses_dropped.load(Ordering::Relaxed) == 1
        }));
        assert!(rx.try_recv().is_err());
        assert_eq!(requester.pending_count(), 0);
    }

    #[test]
    fn test_cancel_after_success_keeps_result() {
        let link = Link::new();
        let _receiver = echo_receiver(&link);
        let requester = requester(&link);

        let (tx, rx) = results_channel();
        let request = requester.start_async_request(json!(5), callback_into(&tx));
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            RequestResult::Succeeded(json!({"echo": 5}))
        );

        assert!(request.is_finished());
        assert!(!request.cancel());
        assert!(rx.try_recv().is_err());
    }
}

//! End-to-end workflow tests: offer → approval chain → LOA → purchase
//! orders → EMD, with notifications observed on the bus.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use tenderflow_auth::{Actor, Role};
    use tenderflow_core::{Money, UserId};
    use tenderflow_emd::{EmdStatus, EmdTracking};
    use tenderflow_events::{EventBus, InMemoryEventBus};
    use tenderflow_loa::Loa;
    use tenderflow_offers::{ApprovalStatus, BudgetaryOffer, EmdDetails, OfferStatus, WorkItem};
    use tenderflow_purchasing::{PurchaseOrder, PurchaseOrderStatus, VendorId};

    use crate::clock::FixedClock;
    use crate::emd::EmdService;
    use crate::error::WorkflowError;
    use crate::loa::{LoaService, RecordAmendmentInput, RecordLoaInput};
    use crate::notify::NotificationEnvelope;
    use crate::offers::{CreateOfferInput, OfferService};
    use crate::purchasing::{CreatePoInput, PurchasingService};
    use crate::store::InMemoryStore;

    type Bus = Arc<InMemoryEventBus<NotificationEnvelope>>;

    struct World {
        offers: OfferService<Arc<InMemoryStore<BudgetaryOffer>>, Bus, FixedClock>,
        loas: LoaService<Arc<InMemoryStore<Loa>>, Arc<InMemoryStore<PurchaseOrder>>, Bus, FixedClock>,
        purchasing:
            PurchasingService<Arc<InMemoryStore<PurchaseOrder>>, Arc<InMemoryStore<Loa>>, Bus, FixedClock>,
        emds: EmdService<Arc<InMemoryStore<EmdTracking>>, Arc<InMemoryStore<BudgetaryOffer>>, Bus, FixedClock>,
        bus: Bus,
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap())
    }

    fn world() -> World {
        let offer_store = Arc::new(InMemoryStore::new());
        let loa_store = Arc::new(InMemoryStore::new());
        let po_store = Arc::new(InMemoryStore::new());
        let emd_store = Arc::new(InMemoryStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());

        World {
            offers: OfferService::new(offer_store.clone(), bus.clone(), clock()),
            loas: LoaService::new(loa_store.clone(), po_store.clone(), bus.clone(), clock()),
            purchasing: PurchasingService::new(po_store, loa_store, bus.clone(), clock()),
            emds: EmdService::new(emd_store, offer_store, bus.clone(), clock()),
            bus,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// One work item: 10 units at 1000/unit with 18% tax = 11800.00.
    fn work_items() -> Vec<WorkItem> {
        vec![WorkItem {
            description: "Supply of signalling cable".to_string(),
            quantity: Decimal::from(10),
            unit: "drums".to_string(),
            base_rate: Money::from_major(1000),
            tax_rate: Decimal::from(18),
        }]
    }

    fn offer_input(approvers: Vec<UserId>) -> CreateOfferInput {
        CreateOfferInput {
            subject: "Budgetary offer for cable supply".to_string(),
            offer_date: date(2026, 3, 1),
            to_authority: "Dy.CSTE/Con/NFR".to_string(),
            work_items: work_items(),
            emd: EmdDetails {
                amount: Money::from_major(500),
                due_date: date(2026, 4, 1),
            },
            terms: "Delivery within 90 days".to_string(),
            approvers,
        }
    }

    fn approved_offer(world: &World, author: &Actor) -> BudgetaryOffer {
        let approver = Actor::user(UserId::new());
        let offer = world
            .offers
            .create_offer(author, offer_input(vec![approver.user_id]))
            .unwrap();
        world
            .offers
            .submit_for_approval(author, offer.id_typed())
            .unwrap();
        world
            .offers
            .process_approval(&approver, offer.id_typed(), true, None)
            .unwrap()
    }

    #[test]
    fn offer_walks_a_two_level_chain_to_approved() {
        let world = world();
        let author = Actor::user(UserId::new());
        let first = Actor::user(UserId::new());
        let second = Actor::user(UserId::new());

        let offer = world
            .offers
            .create_offer(&author, offer_input(vec![first.user_id, second.user_id]))
            .unwrap();
        assert_eq!(offer.status(), OfferStatus::Draft);
        assert_eq!(offer.value(), Money::from_major(11_800));

        let offer = world
            .offers
            .submit_for_approval(&author, offer.id_typed())
            .unwrap();
        assert_eq!(offer.status(), OfferStatus::PendingApproval);
        assert_eq!(offer.current_level(), Some(1));
        assert_eq!(offer.awaiting_approver(), Some(first.user_id));

        let offer = world
            .offers
            .process_approval(&first, offer.id_typed(), true, None)
            .unwrap();
        assert_eq!(offer.status(), OfferStatus::PendingApproval);
        assert_eq!(offer.current_level(), Some(2));

        let offer = world
            .offers
            .process_approval(&second, offer.id_typed(), true, Some("ok".to_string()))
            .unwrap();
        assert_eq!(offer.status(), OfferStatus::Approved);
        assert_eq!(offer.current_level(), None);
        assert!(
            offer
                .approval_levels()
                .iter()
                .all(|l| l.status == ApprovalStatus::Approved)
        );
    }

    #[test]
    fn rejection_resets_the_chain_and_resubmission_restarts_it() {
        let world = world();
        let author = Actor::user(UserId::new());
        let first = Actor::user(UserId::new());
        let second = Actor::user(UserId::new());

        let offer = world
            .offers
            .create_offer(&author, offer_input(vec![first.user_id, second.user_id]))
            .unwrap();
        world
            .offers
            .submit_for_approval(&author, offer.id_typed())
            .unwrap();
        world
            .offers
            .process_approval(&first, offer.id_typed(), true, None)
            .unwrap();

        let offer = world
            .offers
            .process_approval(
                &second,
                offer.id_typed(),
                false,
                Some("rates out of line".to_string()),
            )
            .unwrap();
        assert_eq!(offer.status(), OfferStatus::Draft);
        assert!(
            offer
                .approval_levels()
                .iter()
                .take(2)
                .all(|l| l.status == ApprovalStatus::Rejected)
        );
        assert_eq!(offer.rejection_history().len(), 1);
        assert_eq!(offer.rejection_history()[0].level, 2);
        assert_eq!(
            offer.rejection_history()[0].prior_status,
            OfferStatus::PendingApproval
        );

        // Resubmission restarts the whole chain at level 1.
        let offer = world
            .offers
            .submit_for_approval(&author, offer.id_typed())
            .unwrap();
        assert_eq!(offer.current_level(), Some(1));
        assert_eq!(offer.awaiting_approver(), Some(first.user_id));
        assert!(
            offer
                .approval_levels()
                .iter()
                .all(|l| l.status == ApprovalStatus::Pending)
        );
    }

    #[test]
    fn only_the_pending_approver_may_act() {
        let world = world();
        let author = Actor::user(UserId::new());
        let first = Actor::user(UserId::new());
        let second = Actor::user(UserId::new());

        let offer = world
            .offers
            .create_offer(&author, offer_input(vec![first.user_id, second.user_id]))
            .unwrap();
        world
            .offers
            .submit_for_approval(&author, offer.id_typed())
            .unwrap();

        // Level 2 cannot act while level 1 is pending.
        let err = world
            .offers
            .process_approval(&second, offer.id_typed(), true, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }

    #[test]
    fn submission_requires_author_or_procurement_manager() {
        let world = world();
        let author = Actor::user(UserId::new());
        let approver = Actor::user(UserId::new());
        let stranger = Actor::user(UserId::new());
        let manager = Actor::new(UserId::new(), [Role::procurement_manager()]);

        let offer = world
            .offers
            .create_offer(&author, offer_input(vec![approver.user_id]))
            .unwrap();

        let err = world
            .offers
            .submit_for_approval(&stranger, offer.id_typed())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        world
            .offers
            .submit_for_approval(&manager, offer.id_typed())
            .unwrap();
    }

    #[test]
    fn loa_numbers_are_unique() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);

        let input = RecordLoaInput {
            loa_no: "LOA/2026/NFR/001".to_string(),
            offer_id: offer.id_typed(),
            value: Money::from_major(100_000),
            scope: "Cable supply".to_string(),
            document_key: None,
        };
        world.loas.record_loa(&author, input.clone()).unwrap();

        let err = world.loas.record_loa(&author, input).unwrap_err();
        assert!(matches!(err, WorkflowError::Duplicate(_)));
    }

    #[test]
    fn allocation_is_enforced_across_purchase_orders() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);

        let loa = world
            .loas
            .record_loa(
                &author,
                RecordLoaInput {
                    loa_no: "LOA/2026/NFR/002".to_string(),
                    offer_id: offer.id_typed(),
                    value: Money::from_major(100_000),
                    scope: "Cable supply".to_string(),
                    document_key: None,
                },
            )
            .unwrap();
        let vendor = VendorId(tenderflow_core::AggregateId::new());

        let po_input = |value: i64| CreatePoInput {
            loa_id: loa.id_typed(),
            vendor_id: vendor,
            value: Money::from_major(value),
            delivery_date: date(2026, 6, 30),
            items: vec![],
        };

        let first = world.purchasing.create_po(&author, po_input(60_000)).unwrap();
        assert_eq!(first.po_number(), "PO-2026-0001");

        // 60k committed, 40k remaining: a 45k order must be rejected.
        let err = world
            .purchasing
            .create_po(&author, po_input(45_000))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InsufficientBalance {
                requested: Money::from_major(45_000),
                remaining: Money::from_major(40_000),
            }
        );

        let second = world.purchasing.create_po(&author, po_input(40_000)).unwrap();
        assert_eq!(second.po_number(), "PO-2026-0002");

        let utilization = world.loas.get_utilization(loa.id_typed()).unwrap();
        assert_eq!(utilization.utilized_amount, Money::from_major(100_000));
        assert_eq!(utilization.remaining_amount, Money::ZERO);
        assert_eq!(utilization.utilization_percentage, Decimal::ONE_HUNDRED);

        // Cancelling an order releases its allocation.
        world
            .purchasing
            .update_status(&author, second.id_typed(), PurchaseOrderStatus::Issued, None)
            .unwrap();
        world
            .purchasing
            .update_status(
                &author,
                second.id_typed(),
                PurchaseOrderStatus::Cancelled,
                Some("vendor withdrew".to_string()),
            )
            .unwrap();
        let utilization = world.loas.get_utilization(loa.id_typed()).unwrap();
        assert_eq!(utilization.remaining_amount, Money::from_major(40_000));
    }

    #[test]
    fn draft_update_rechecks_allocation_on_the_delta() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);

        let loa = world
            .loas
            .record_loa(
                &author,
                RecordLoaInput {
                    loa_no: "LOA/2026/NFR/003".to_string(),
                    offer_id: offer.id_typed(),
                    value: Money::from_major(100_000),
                    scope: "Cable supply".to_string(),
                    document_key: None,
                },
            )
            .unwrap();
        let vendor = VendorId(tenderflow_core::AggregateId::new());
        let po = world
            .purchasing
            .create_po(
                &author,
                CreatePoInput {
                    loa_id: loa.id_typed(),
                    vendor_id: vendor,
                    value: Money::from_major(90_000),
                    delivery_date: date(2026, 6, 30),
                    items: vec![],
                },
            )
            .unwrap();

        // 10k headroom: growing the draft to 100k is allowed (delta 10k),
        // growing to 100k + 1 would not be.
        world
            .purchasing
            .update_draft(
                &author,
                po.id_typed(),
                Money::from_major(100_000),
                date(2026, 6, 30),
                vec![],
            )
            .unwrap();

        let err = world
            .purchasing
            .update_draft(
                &author,
                po.id_typed(),
                Money::from_major(100_001),
                date(2026, 6, 30),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientBalance { .. }));

        // Shrinking is always allowed.
        let po = world
            .purchasing
            .update_draft(
                &author,
                po.id_typed(),
                Money::from_major(50_000),
                date(2026, 6, 30),
                vec![],
            )
            .unwrap();
        assert_eq!(po.value(), Money::from_major(50_000));
    }

    #[test]
    fn approved_amendment_raises_the_allocation_ceiling() {
        let world = world();
        let author = Actor::user(UserId::new());
        let admin = Actor::new(UserId::new(), [Role::admin()]);
        let offer = approved_offer(&world, &author);

        let loa = world
            .loas
            .record_loa(
                &author,
                RecordLoaInput {
                    loa_no: "LOA/2026/NFR/004".to_string(),
                    offer_id: offer.id_typed(),
                    value: Money::from_major(100_000),
                    scope: "Cable supply".to_string(),
                    document_key: None,
                },
            )
            .unwrap();

        let amendment = world
            .loas
            .record_amendment(
                &author,
                loa.id_typed(),
                RecordAmendmentInput {
                    additional_value: Money::from_major(20_000),
                    reason: "Quantity variation".to_string(),
                    effective_date: date(2026, 5, 1),
                },
            )
            .unwrap();

        // Pending amendments do not count.
        let utilization = world.loas.get_utilization(loa.id_typed()).unwrap();
        assert_eq!(utilization.total_value, Money::from_major(100_000));

        // Approval requires the admin role.
        let err = world.loas.approve_amendment(&author, amendment.id).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        world.loas.approve_amendment(&admin, amendment.id).unwrap();
        let utilization = world.loas.get_utilization(loa.id_typed()).unwrap();
        assert_eq!(utilization.total_value, Money::from_major(120_000));
        assert_eq!(utilization.remaining_amount, Money::from_major(120_000));
    }

    #[test]
    fn utilization_reads_are_idempotent() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);
        let loa = world
            .loas
            .record_loa(
                &author,
                RecordLoaInput {
                    loa_no: "LOA/2026/NFR/006".to_string(),
                    offer_id: offer.id_typed(),
                    value: Money::from_major(100_000),
                    scope: "Cable supply".to_string(),
                    document_key: None,
                },
            )
            .unwrap();
        world
            .purchasing
            .create_po(
                &author,
                CreatePoInput {
                    loa_id: loa.id_typed(),
                    vendor_id: VendorId(tenderflow_core::AggregateId::new()),
                    value: Money::from_major(25_000),
                    delivery_date: date(2026, 6, 30),
                    items: vec![],
                },
            )
            .unwrap();

        // Two reads with no writes in between must agree exactly.
        let first = world.loas.get_utilization(loa.id_typed()).unwrap();
        let second = world.loas.get_utilization(loa.id_typed()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.utilized_amount, Money::from_major(25_000));
    }

    #[test]
    fn po_status_follows_the_transition_table() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);
        let loa = world
            .loas
            .record_loa(
                &author,
                RecordLoaInput {
                    loa_no: "LOA/2026/NFR/005".to_string(),
                    offer_id: offer.id_typed(),
                    value: Money::from_major(100_000),
                    scope: "Cable supply".to_string(),
                    document_key: None,
                },
            )
            .unwrap();
        let po = world
            .purchasing
            .create_po(
                &author,
                CreatePoInput {
                    loa_id: loa.id_typed(),
                    vendor_id: VendorId(tenderflow_core::AggregateId::new()),
                    value: Money::from_major(10_000),
                    delivery_date: date(2026, 6, 30),
                    items: vec![],
                },
            )
            .unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Draft);

        // Draft cannot jump straight to completed.
        let err = world
            .purchasing
            .update_status(&author, po.id_typed(), PurchaseOrderStatus::Completed, None)
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                current: "draft".to_string(),
                requested: "completed".to_string(),
                allowed: vec!["issued".to_string()],
            }
        );

        for status in [
            PurchaseOrderStatus::Issued,
            PurchaseOrderStatus::InProgress,
            PurchaseOrderStatus::Completed,
        ] {
            world
                .purchasing
                .update_status(&author, po.id_typed(), status, None)
                .unwrap();
        }
        let po = world.purchasing.get(po.id_typed()).unwrap();
        assert_eq!(po.status(), PurchaseOrderStatus::Completed);
        // Created (no entry) + three transitions.
        assert_eq!(po.status_history().len(), 3);
    }

    #[test]
    fn emd_is_capped_unique_per_offer_and_stamps_return_date() {
        let world = world();
        let author = Actor::user(UserId::new());
        let offer = approved_offer(&world, &author);

        // Offer value is 11800, so the 5% cap is 590.
        let err = world
            .emds
            .submit_emd(
                &author,
                offer.id_typed(),
                Money::from_major(600),
                date(2026, 4, 1),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let emd = world
            .emds
            .submit_emd(
                &author,
                offer.id_typed(),
                Money::from_major(500),
                date(2026, 4, 1),
            )
            .unwrap();
        assert_eq!(emd.status(), EmdStatus::Pending);

        let err = world
            .emds
            .submit_emd(
                &author,
                offer.id_typed(),
                Money::from_major(100),
                date(2026, 4, 1),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Duplicate(_)));

        let emd = world
            .emds
            .update_status(&author, emd.id_typed(), EmdStatus::Submitted)
            .unwrap();
        assert!(emd.return_date().is_none());

        let emd = world
            .emds
            .update_status(&author, emd.id_typed(), EmdStatus::Returned)
            .unwrap();
        assert_eq!(emd.return_date(), Some(clock().0));

        let emd = world
            .emds
            .attach_document(&author, emd.id_typed(), "docs/emd-receipt-001".to_string())
            .unwrap();
        assert_eq!(emd.document_key(), Some("docs/emd-receipt-001"));
    }

    #[test]
    fn missing_aggregates_surface_not_found() {
        let world = world();
        let author = Actor::user(UserId::new());

        let err = world
            .emds
            .submit_emd(
                &author,
                tenderflow_offers::OfferId(tenderflow_core::AggregateId::new()),
                Money::from_major(1),
                date(2026, 4, 1),
            )
            .unwrap_err();
        assert_eq!(err, WorkflowError::NotFound);

        let err = world
            .purchasing
            .create_po(
                &author,
                CreatePoInput {
                    loa_id: tenderflow_loa::LoaId(tenderflow_core::AggregateId::new()),
                    vendor_id: VendorId(tenderflow_core::AggregateId::new()),
                    value: Money::from_major(1),
                    delivery_date: date(2026, 6, 30),
                    items: vec![],
                },
            )
            .unwrap_err();
        assert_eq!(err, WorkflowError::NotFound);
    }

    #[test]
    fn state_changes_publish_notifications() {
        let world = world();
        let subscription = world.bus.subscribe();
        let author = Actor::user(UserId::new());
        let approver = Actor::user(UserId::new());

        let offer = world
            .offers
            .create_offer(&author, offer_input(vec![approver.user_id]))
            .unwrap();
        world
            .offers
            .submit_for_approval(&author, offer.id_typed())
            .unwrap();
        world
            .offers
            .process_approval(&approver, offer.id_typed(), true, None)
            .unwrap();

        let mut topics = Vec::new();
        while let Ok(envelope) = subscription.try_recv() {
            assert_eq!(envelope.aggregate_type(), "budgetary_offer");
            topics.push(envelope.payload().topic.clone());
        }
        assert_eq!(
            topics,
            vec!["offer.created", "offer.submitted", "offer.approval_granted"]
        );
    }
}

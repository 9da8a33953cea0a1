use chrono::Duration;

use repayment_engine::{
    Bullet, Cadence, CouponBond, EventOrder, FixedRateMortgage, LoanKind,
    NonAccumulatingInterest, PaymentSchedule, ScheduleTerms,
};

/// Drive a schedule to completion, collecting every installment.
fn run_to_completion(schedule: &mut PaymentSchedule) -> Vec<f64> {
    let mut paid = Vec::new();
    while !schedule.is_fully_repaid() {
        paid.push(schedule.next_installment_due());
        schedule.advance_phase().unwrap();
    }
    paid
}

#[test]
fn coupon_bond_pays_coupons_then_principal() {
    let mut schedule: PaymentSchedule =
        CouponBond::new(1000.0, 0.03, 5, Cadence::daily()).unwrap().into();
    assert!((schedule.face_value() - 1150.0).abs() < 1e-9);

    let paid = run_to_completion(&mut schedule);
    assert_eq!(paid.len(), 5);
    for coupon in &paid[..4] {
        assert!((coupon - 30.0).abs() < 1e-9);
    }
    assert!((paid[4] - 1030.0).abs() < 1e-9);
    assert!((paid.iter().sum::<f64>() - 1150.0).abs() < 1e-9);
    assert_eq!(schedule.debt_now(), 0.0);
    assert_eq!(schedule.next_installment_due(), 0.0);
}

#[test]
fn mortgage_matches_annuity_formula() {
    let mut schedule: PaymentSchedule =
        FixedRateMortgage::new(1000.0, 0.05, 10, Cadence::daily()).unwrap().into();
    assert!((schedule.next_installment_due() - 129.5046).abs() < 1e-3);

    let paid = run_to_completion(&mut schedule);
    assert_eq!(paid.len(), 10);
    assert!((paid.iter().sum::<f64>() - 1295.046).abs() < 1e-2);
    assert_eq!(schedule.debt_now(), 0.0);
}

#[test]
fn mortgage_balance_amortizes_each_phase() {
    let mut schedule: PaymentSchedule =
        FixedRateMortgage::new(1000.0, 0.05, 10, Cadence::daily()).unwrap().into();
    let installment = schedule.next_installment_due();

    let expected = 1000.0 * 1.05 - installment;
    assert!((schedule.debt_in_next_phase() - expected).abs() < 1e-9);
    schedule.advance_phase().unwrap();
    assert!((schedule.debt_now() - expected).abs() < 1e-9);
    assert_eq!(schedule.phases_remaining(), 9);
}

#[test]
fn mortgage_extension_reamortizes_remaining_balance() {
    let mut schedule: PaymentSchedule =
        FixedRateMortgage::new(1000.0, 0.05, 10, Cadence::daily()).unwrap().into();
    for _ in 0..4 {
        schedule.advance_phase().unwrap();
    }
    schedule.extend(300.0).unwrap();

    let balance = schedule.debt_now();
    let growth = 1.05_f64.powi(6);
    let expected = balance * 0.05 * growth / (growth - 1.0);
    assert!((schedule.next_installment_due() - expected).abs() < 1e-9);
    assert_eq!(schedule.total_phases(), 6);

    let paid = run_to_completion(&mut schedule);
    assert_eq!(paid.len(), 6);
}

#[test]
fn non_accumulating_interest_pays_equal_installments() {
    let mut schedule: PaymentSchedule =
        NonAccumulatingInterest::new(1000.0, 0.1, 4, Cadence::daily()).unwrap().into();
    let paid = run_to_completion(&mut schedule);
    assert_eq!(paid.len(), 4);
    for installment in &paid {
        assert!((installment - 275.0).abs() < 1e-9);
    }
    assert!((paid.iter().sum::<f64>() - 1100.0).abs() < 1e-9);
}

#[test]
fn non_accumulating_interest_edits_are_asymmetric() {
    let mut schedule: PaymentSchedule =
        NonAccumulatingInterest::new(1000.0, 0.1, 4, Cadence::daily()).unwrap().into();

    schedule.extend(110.0).unwrap();
    assert!((schedule.total_principal() - 1100.0).abs() < 1e-9);
    assert!((schedule.debt_now() - 1210.0).abs() < 1e-9);

    schedule.reduce(110.0).unwrap();
    assert!((schedule.total_principal() - 1100.0).abs() < 1e-9);
    assert!((schedule.debt_now() - 1100.0).abs() < 1e-9);
    assert!((schedule.next_installment_due() - 275.0).abs() < 1e-9);
}

#[test]
fn bullet_repays_in_one_installment() {
    let mut schedule: PaymentSchedule = Bullet::new(1000.0, 0.1, Cadence::daily()).unwrap().into();
    assert!(!schedule.is_fully_repaid());
    assert!(schedule.is_last_phase());
    assert!((schedule.next_installment_due() - 1100.0).abs() < 1e-9);

    schedule.advance_phase().unwrap();
    assert!(schedule.is_fully_repaid());
    assert_eq!(schedule.debt_now(), 0.0);
}

#[test]
fn repaid_schedules_reject_further_advances() {
    let cadence = Cadence::daily();
    let schedules: Vec<PaymentSchedule> = vec![
        CouponBond::new(100.0, 0.02, 2, cadence).unwrap().into(),
        Bullet::new(100.0, 0.02, cadence).unwrap().into(),
        FixedRateMortgage::new(100.0, 0.02, 3, cadence).unwrap().into(),
        NonAccumulatingInterest::new(100.0, 0.02, 3, cadence).unwrap().into(),
    ];
    for mut schedule in schedules {
        run_to_completion(&mut schedule);
        assert!(schedule.advance_phase().is_err(), "{}", schedule.kind());
        assert!(schedule.extend(10.0).is_err(), "{}", schedule.kind());
        assert!(schedule.reduce(10.0).is_err(), "{}", schedule.kind());
    }
}

#[test]
fn invalid_parameters_are_rejected() {
    let cadence = Cadence::daily();
    assert!(CouponBond::new(0.0, 0.03, 5, cadence).is_err());
    assert!(CouponBond::new(1000.0, -0.03, 5, cadence).is_err());
    assert!(CouponBond::new(1000.0, 0.03, 0, cadence).is_err());
    assert!(FixedRateMortgage::new(1000.0, 0.0, 10, cadence).is_err());
    assert!(NonAccumulatingInterest::new(f64::NAN, 0.1, 4, cadence).is_err());
    assert!(Bullet::new(-1.0, 0.1, cadence).is_err());
}

#[test]
fn terms_from_config_build_schedules() {
    let json = r#"{
        "kind": "coupon_bond",
        "principal": 500.0,
        "interest_per_coupon": 0.02,
        "coupons": 4,
        "cadence": { "order": "bond_payments", "interval_seconds": 604800 }
    }"#;
    let terms = ScheduleTerms::from_json(json).unwrap();
    let schedule = terms.build().unwrap();
    assert_eq!(schedule.kind(), LoanKind::CouponBond);
    assert_eq!(schedule.cadence().order, EventOrder::BondPayments);
    assert_eq!(schedule.cadence().interval, Duration::days(7));

    let tiny_rate = ScheduleTerms::FixedRateMortgage {
        principal: 1000.0,
        rate: 0.0,
        installments: 4,
        cadence: Cadence::daily(),
    };
    let schedule = tiny_rate.build().unwrap();
    assert_eq!(schedule.kind(), LoanKind::NonAccumulatingInterest);
    assert!((schedule.next_installment_due() - 250.0).abs() < 1e-9);
}

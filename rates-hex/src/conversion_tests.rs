//! ConversionEngine unit tests.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use rates_types::{CurrencyCode, DomainError, RateRecord, RepoError};

    use crate::conversion::ConversionEngine;
    use crate::mocks::{Harness, harness};

    async fn engine_with(rates: &[(CurrencyCode, Decimal)]) -> (ConversionEngine, Harness) {
        let h = harness();
        for (code, rate) in rates {
            h.repo
                .put(RateRecord::new(*code, *rate).unwrap())
                .await
                .unwrap();
        }
        (ConversionEngine::new(h.repo.clone(), CurrencyCode::TWD), h)
    }

    #[tokio::test]
    async fn test_convert_to_base_from_base_needs_no_lookup() {
        let (engine, h) = engine_with(&[]).await;
        h.store.fail_everything();

        let result = engine
            .convert_to_base(dec!(123.456), CurrencyCode::TWD)
            .await
            .unwrap();

        assert_eq!(result, dec!(123.456));
        assert_eq!(h.store.finds(), 0);
    }

    #[tokio::test]
    async fn test_same_currency_without_record() {
        let (engine, h) = engine_with(&[]).await;

        let result = engine
            .convert(dec!(99.999), CurrencyCode::JPY, CurrencyCode::JPY)
            .await
            .unwrap();

        assert_eq!(result, dec!(99.999));
        assert_eq!(h.store.finds(), 0);
    }

    #[tokio::test]
    async fn test_usd_twd_scenario() {
        let (engine, _h) = engine_with(&[(CurrencyCode::USD, dec!(31.25))]).await;

        let to_twd = engine
            .convert(dec!(1000.00), CurrencyCode::USD, CurrencyCode::TWD)
            .await
            .unwrap();
        let to_usd = engine
            .convert(dec!(31250.00), CurrencyCode::TWD, CurrencyCode::USD)
            .await
            .unwrap();

        assert_eq!(to_twd, dec!(31250.00));
        assert_eq!(to_usd, dec!(1000.00));
    }

    #[tokio::test]
    async fn test_cross_conversion_via_base() {
        let (engine, _h) = engine_with(&[
            (CurrencyCode::USD, dec!(31.25)),
            (CurrencyCode::EUR, dec!(34.722222)),
        ])
        .await;

        let eur = engine
            .convert(dec!(100), CurrencyCode::USD, CurrencyCode::EUR)
            .await
            .unwrap();
        let back = engine
            .convert(eur, CurrencyCode::EUR, CurrencyCode::USD)
            .await
            .unwrap();

        assert_eq!(eur, dec!(90.00));
        assert!((back - dec!(100)).abs() <= dec!(0.01));
    }

    #[tokio::test]
    async fn test_half_up_rounding_to_cents() {
        let (engine, _h) = engine_with(&[(CurrencyCode::USD, dec!(31.25))]).await;

        // 0.3125 and 0.625
        let low = engine
            .convert_to_base(dec!(0.01), CurrencyCode::USD)
            .await
            .unwrap();
        let mid = engine
            .convert_to_base(dec!(0.02), CurrencyCode::USD)
            .await
            .unwrap();

        assert_eq!(low, dec!(0.31));
        assert_eq!(mid, dec!(0.63));
    }

    #[tokio::test]
    async fn test_missing_rate_is_not_found() {
        let (engine, _h) = engine_with(&[(CurrencyCode::USD, dec!(31.25))]).await;

        let from_missing = engine
            .convert(dec!(10), CurrencyCode::EUR, CurrencyCode::TWD)
            .await;
        let to_missing = engine
            .convert(dec!(10), CurrencyCode::USD, CurrencyCode::JPY)
            .await;

        assert!(matches!(
            from_missing,
            Err(RepoError::Domain(DomainError::CurrencyNotFound(CurrencyCode::EUR)))
        ));
        assert!(matches!(
            to_missing,
            Err(RepoError::Domain(DomainError::CurrencyNotFound(CurrencyCode::JPY)))
        ));
    }

    #[tokio::test]
    async fn test_zero_stored_rate_is_invalid_state() {
        let (engine, h) = engine_with(&[(CurrencyCode::USD, dec!(31.25))]).await;
        h.store
            .insert_raw(RateRecord::from_parts(CurrencyCode::EUR, dec!(0), Utc::now()))
            .await;

        let as_source = engine.convert_to_base(dec!(10), CurrencyCode::EUR).await;
        let as_target = engine
            .convert(dec!(10), CurrencyCode::USD, CurrencyCode::EUR)
            .await;

        assert!(matches!(
            as_source,
            Err(RepoError::Domain(DomainError::InvalidRateState { .. }))
        ));
        assert!(matches!(
            as_target,
            Err(RepoError::Domain(DomainError::InvalidRateState { .. }))
        ));
    }

    #[tokio::test]
    async fn test_convert_with_quote_agrees_with_separate_calls() {
        let (engine, _h) = engine_with(&[
            (CurrencyCode::USD, dec!(31.25)),
            (CurrencyCode::JPY, dec!(0.213333)),
        ])
        .await;

        let (converted, rate) = engine
            .convert_with_quote(dec!(12.34), CurrencyCode::USD, CurrencyCode::JPY)
            .await
            .unwrap();

        assert_eq!(
            converted,
            engine
                .convert(dec!(12.34), CurrencyCode::USD, CurrencyCode::JPY)
                .await
                .unwrap()
        );
        assert_eq!(
            rate,
            engine.quote(CurrencyCode::USD, CurrencyCode::JPY).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_quote_reports_effective_rate() {
        let (engine, _h) = engine_with(&[
            (CurrencyCode::USD, dec!(31.25)),
            (CurrencyCode::EUR, dec!(34.722222)),
        ])
        .await;

        assert_eq!(
            engine.quote(CurrencyCode::USD, CurrencyCode::TWD).await.unwrap(),
            dec!(31.25)
        );
        assert_eq!(
            engine.quote(CurrencyCode::TWD, CurrencyCode::USD).await.unwrap(),
            dec!(0.032)
        );
        assert_eq!(
            engine.quote(CurrencyCode::USD, CurrencyCode::EUR).await.unwrap(),
            dec!(0.9)
        );
        assert_eq!(
            engine.quote(CurrencyCode::CNY, CurrencyCode::CNY).await.unwrap(),
            Decimal::ONE
        );
    }
}

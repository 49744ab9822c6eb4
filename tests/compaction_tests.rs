//! Tests for parameter compaction against the verifier's lane decoding

#[cfg(test)]
mod tests {
    use ethers::types::U256;
    use oracle_tools::compaction::{
        compact, compact_oracle_block_numbers, compact_prices, pack_signer_info, unpack,
        unpack_signer_info, BLOCK_NUMBER_LANES, PRICE_LANES,
    };
    use oracle_tools::OracleError;
    use rand::Rng;

    // ============================================================================
    // Round trips
    // ============================================================================

    #[test]
    fn test_price_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..=8);
            let prices: Vec<U256> = (0..len).map(|_| U256::from(rng.gen::<u32>())).collect();

            let words = compact_prices(&prices).unwrap();
            assert!(words.len() <= 1);
            assert_eq!(unpack(&words, &PRICE_LANES, len).unwrap(), prices);
        }
    }

    #[test]
    fn test_block_number_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..=12);
            let blocks: Vec<U256> = (0..len).map(|_| U256::from(rng.gen::<u64>())).collect();

            let words = compact_oracle_block_numbers(&blocks).unwrap();
            assert_eq!(words.len(), (len + 3) / 4);
            assert_eq!(unpack(&words, &BLOCK_NUMBER_LANES, len).unwrap(), blocks);
        }
    }

    #[test]
    fn test_signer_info_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let indexes: Vec<u64> = (0..3).map(|_| rng.gen_range(0..=255)).collect();
            let info = pack_signer_info(&indexes).unwrap();

            assert_eq!(info & U256::from(0xffffu64), U256::from(3));
            assert_eq!(unpack_signer_info(info), indexes);
        }
    }

    // ============================================================================
    // Layout
    // ============================================================================

    #[test]
    fn test_lane_zero_is_least_significant() {
        let words = compact(&[U256::from(0xaau64), U256::from(0xbbu64)], &PRICE_LANES).unwrap();
        assert_eq!(words, vec![U256::from(0xaau64) | (U256::from(0xbbu64) << 32)]);
    }

    #[test]
    fn test_three_prices_use_ninety_six_bits() {
        let price = U256::from(4_000_000_000u64);
        let words = compact_prices(&[price, price, price]).unwrap();

        assert_eq!(words.len(), 1);
        assert!(words[0].bits() <= 96);
        assert!(words[0].bits() > 64);
    }

    #[test]
    fn test_fourth_block_number_fills_top_lane() {
        let blocks: Vec<U256> = (1..=5u64).map(U256::from).collect();
        let words = compact_oracle_block_numbers(&blocks).unwrap();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0] >> 192, U256::from(4));
        assert_eq!(words[1], U256::from(5));
    }

    // ============================================================================
    // Bounds
    // ============================================================================

    #[test]
    fn test_price_boundary() {
        assert!(compact_prices(&[U256::from(4_294_967_295u64)]).is_ok());

        match compact_prices(&[U256::from(4_294_967_296u64)]) {
            Err(OracleError::FieldOverflow { value, max, .. }) => {
                assert_eq!(value, U256::from(4_294_967_296u64));
                assert_eq!(max, U256::from(u32::MAX));
            }
            other => panic!("expected FieldOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_signer_index_boundary() {
        assert!(pack_signer_info(&[255]).is_ok());
        assert!(matches!(
            pack_signer_info(&[256]),
            Err(OracleError::FieldOverflow { .. })
        ));
    }

    #[test]
    fn test_single_oversized_value_aborts_whole_call() {
        let mut prices = vec![U256::from(1); 20];
        prices[17] = U256::from(u32::MAX) + 1;
        assert!(compact_prices(&prices).is_err());
    }
}

use parti::{Clustering, FuzzyCMeans, Kmeans};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_kmeans_all_assigned(
        data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 1..20),
        k in 1usize..5
    ) {
        // Skip if k > n
        if k <= data.len() {
            let model = Kmeans::new(k).with_seed(42);
            let labels = model.fit_predict(&data).unwrap();

            prop_assert_eq!(labels.len(), data.len());
            for &l in &labels {
                prop_assert!(l < k);
            }
        }
    }

    #[test]
    fn prop_fcm_memberships_are_distributions(
        data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 2..20),
        k in 2usize..5
    ) {
        if k <= data.len() {
            let model = FuzzyCMeans::new(k).with_seed(42);
            let partition = model.fit(&data).unwrap();
            let memberships = partition.memberships.unwrap();

            for i in 0..data.len() {
                let mut sum = 0.0;
                for c in 0..k {
                    let u = memberships[[c, i]];
                    prop_assert!((0.0..=1.0).contains(&u));
                    sum += u;
                }
                prop_assert!((sum - 1.0).abs() < 1e-9);
            }

            // Crisp view stays in range too.
            for &l in &partition.labels {
                prop_assert!(l < k);
            }
        }
    }

    #[test]
    fn prop_kmeans_seed_determinism(
        data in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 3), 4..15),
        seed in 0u64..1000
    ) {
        let a = Kmeans::new(2).with_seed(seed).fit_predict(&data).unwrap();
        let b = Kmeans::new(2).with_seed(seed).fit_predict(&data).unwrap();
        prop_assert_eq!(a, b);
    }
}

//! Property tests for the hash engines.

use image::{DynamicImage, GrayImage};
use pihash::core::hasher::{HashAlgorithmKind, HasherSet};
use proptest::prelude::*;

fn gray_image(width: u32, height: u32, pixels: &[u8]) -> DynamicImage {
    let samples = pixels.iter().copied().cycle().take((width * height) as usize).collect();
    DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, samples).unwrap())
}

fn image_strategy() -> impl Strategy<Value = DynamicImage> {
    (1u32..48, 1u32..48, prop::collection::vec(any::<u8>(), 1..256))
        .prop_map(|(w, h, pixels)| gray_image(w, h, &pixels))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ahash_is_never_zero(image in image_strategy()) {
        let hashers = HasherSet::new();
        let hash = hashers.hash_image(&image, HashAlgorithmKind::Average).unwrap();
        prop_assert_ne!(hash.value(), 0);
    }

    #[test]
    fn phash_clears_dc_bit_and_sets_half(image in image_strategy()) {
        let hashers = HasherSet::new();
        let hash = hashers.hash_image(&image, HashAlgorithmKind::Perceptual).unwrap();
        prop_assert_eq!(hash.value() >> 63, 0);
        prop_assert!(hash.value().count_ones() >= 32);
    }

    #[test]
    fn hashing_is_deterministic(image in image_strategy()) {
        let first = HasherSet::new();
        let second = HasherSet::new();
        for kind in HashAlgorithmKind::ALL {
            prop_assert_eq!(
                first.hash_image(&image, kind).unwrap(),
                second.hash_image(&image, kind).unwrap()
            );
        }
    }

    #[test]
    fn distance_is_symmetric(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(pihash::hamming_distance(a, b), pihash::hamming_distance(b, a));
        prop_assert_eq!(pihash::hamming_distance(a, a), 0);
    }
}

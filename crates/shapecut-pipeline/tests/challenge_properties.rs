//! Integration test: generate many challenges from a synthetic photo and
//! check the invariants every challenge must satisfy.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use shapecut_pipeline::composite::{TRANSPARENT, WHITE};
use shapecut_pipeline::edge::count_edge_pixels;
use shapecut_pipeline::shape::VERTEX_COUNT;
use shapecut_pipeline::{
    Attempt, AttemptOutcome, ChallengeConfig, PlacementMode, generate_challenge, validate,
};

/// A 160x120 "photo": smooth sky gradient, a dark hill, and a busy
/// checkered patch in the lower right.
fn synthetic_photo_png() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(160, 120, |x, y| {
        let busy = x >= 100 && y >= 70 && x < 140 && y < 110;
        let hill = y > 80 && (i64::from(x) - 40).pow(2) + (i64::from(y) - 120).pow(2) < 45 * 45;
        if busy && (x / 3 + y / 3) % 2 == 0 {
            image::Rgba([250, 240, 30, 255])
        } else if busy {
            image::Rgba([20, 30, 160, 255])
        } else if hill {
            image::Rgba([30, 80, 20, 255])
        } else {
            let v = u8::try_from(120 + y).unwrap();
            image::Rgba([v / 2, v / 2, v, 255])
        }
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

#[test]
fn every_challenge_satisfies_the_invariants() {
    let png = synthetic_photo_png();
    let mut rng = StdRng::seed_from_u64(2024);

    for placement in [PlacementMode::RegionConstrained, PlacementMode::FullImage] {
        let config = ChallengeConfig {
            placement,
            ..ChallengeConfig::default()
        };
        for i in 0..20 {
            let id = format!("photo-{i}");
            let challenge = generate_challenge(&png, &id, &config, &mut rng)
                .expect("pipeline should succeed");

            // Region lies inside the image.
            assert!(challenge.region.fits_within(challenge.dimensions));
            let edge_pixels = count_edge_pixels(&challenge.edges, config.edge_cutoff);
            assert!(challenge.heatmap.total() <= edge_pixels);

            // Outline: 361 vertices, seam closed.
            let points = challenge.polygon.points();
            assert_eq!(points.len(), VERTEX_COUNT);
            assert_eq!(points[360], points[0]);

            // Mask: non-empty, sized to the image.
            assert!(!challenge.mask.is_empty(), "{placement:?} run {i}");
            assert_eq!(challenge.mask.dimensions(), challenge.dimensions);

            // Cut-out and white fill partition the image by the mask.
            for (x, y, px) in challenge.interior.enumerate_pixels() {
                let inside = challenge.mask.contains(x, y);
                assert_eq!(*px != TRANSPARENT, inside);
                assert_eq!(*challenge.white_fill.get_pixel(x, y) == WHITE, inside);
            }

            // Record points at the region origin and accepts itself.
            let record = &challenge.record;
            assert_eq!(record.image_id, id);
            assert_eq!(record.valid_x, i64::from(challenge.region.x));
            assert_eq!(record.valid_y, i64::from(challenge.region.y));
            assert!(validate(record, record.valid_x, record.valid_y));
            assert!(!validate(record, record.valid_x + 11, record.valid_y));
        }
    }
}

#[test]
fn busy_patch_attracts_the_region() {
    let config = ChallengeConfig {
        apply_blur: false,
        ..ChallengeConfig::default()
    };
    let challenge =
        generate_challenge(&synthetic_photo_png(), "busy", &config, &mut StdRng::seed_from_u64(1))
            .unwrap();
    // Blocks are 32x24; the checkered patch covers x 100..140, y 70..110.
    assert!(challenge.region.x >= 96 && challenge.region.x < 140);
    assert!(challenge.region.y >= 48 && challenge.region.y < 110);
}

#[test]
fn attempts_round_trip_through_json() {
    let challenge = generate_challenge(
        &synthetic_photo_png(),
        "json",
        &ChallengeConfig::default(),
        &mut StdRng::seed_from_u64(77),
    )
    .unwrap();
    let body = format!(
        r#"{{"imageId":"json","x":{},"y":{}}}"#,
        challenge.record.valid_x + 3,
        challenge.record.valid_y - 10,
    );
    let attempt: Attempt = serde_json::from_str(&body).unwrap();
    let outcome = AttemptOutcome::judge(&challenge.record, &attempt);
    assert!(outcome.success);
    assert_eq!(
        serde_json::to_string(&outcome).unwrap(),
        r#"{"success":true,"message":"Correct!"}"#
    );
}

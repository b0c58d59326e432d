use crate::models::{BandKind, BandedPlaces, Place, TripBands};

/// Group places into short/medium/long by `distance_from_origin_km`.
///
/// The first band whose range contains the distance wins. Distances outside
/// every range go to the first band whose upper bound is not exceeded, or to
/// the long band. Places without a distance go to `unknown_band`.
pub fn bucket_by_distance(
    places: Vec<Place>,
    bands: &TripBands,
    unknown_band: BandKind,
) -> BandedPlaces {
    let mut banded = BandedPlaces::default();

    for place in places {
        let kind = match place.distance_from_origin_km {
            Some(km) => band_for_distance(km, bands),
            None => unknown_band,
        };
        banded.get_mut(kind).push(place);
    }

    banded
}

fn band_for_distance(km: f64, bands: &TripBands) -> BandKind {
    if let Some(kind) = BandKind::ALL
        .iter()
        .copied()
        .find(|kind| bands.get(*kind).contains(km))
    {
        return kind;
    }

    if km <= bands.short.max_km {
        BandKind::Short
    } else if km <= bands.medium.max_km {
        BandKind::Medium
    } else {
        BandKind::Long
    }
}

/// Move surplus places between bands so each band reaches `minimum` where
/// possible. Bands are filled in short, medium, long order, and only places
/// beyond another band's own minimum are borrowed. No place is dropped.
pub fn rebalance_bands(banded: &mut BandedPlaces, minimum: usize) {
    for kind in BandKind::ALL {
        for donor in BandKind::ALL.into_iter().filter(|d| *d != kind) {
            while banded.get(kind).len() < minimum && banded.get(donor).len() > minimum {
                let borrowed = banded.get_mut(donor).remove(minimum);
                banded.get_mut(kind).push(borrowed);
            }
        }
    }
}

/// Keep at most each band's configured count.
pub fn truncate_bands(banded: &mut BandedPlaces, bands: &TripBands) {
    for kind in BandKind::ALL {
        banded.get_mut(kind).truncate(bands.get(kind).count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn place(name: &str, km: Option<f64>) -> Place {
        let mut place = Place::new(name, "", Coordinates::new(10.0, 76.5).unwrap());
        place.distance_from_origin_km = km;
        place
    }

    fn names(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn in_range_distances_go_to_matching_band() {
        let bands = TripBands::for_days(1);
        let banded = bucket_by_distance(
            vec![
                place("a", Some(45.0)),
                place("b", Some(80.0)),
                place("c", Some(120.0)),
            ],
            &bands,
            BandKind::Medium,
        );
        assert_eq!(names(&banded.short), vec!["a"]);
        assert_eq!(names(&banded.medium), vec!["b"]);
        assert_eq!(names(&banded.long), vec!["c"]);
    }

    #[test]
    fn boundary_goes_to_first_band() {
        let bands = TripBands::for_days(1);
        let banded = bucket_by_distance(vec![place("edge", Some(60.0))], &bands, BandKind::Long);
        assert_eq!(names(&banded.short), vec!["edge"]);
    }

    #[test]
    fn out_of_range_distances_use_upper_bounds() {
        let bands = TripBands::for_days(1);
        let banded = bucket_by_distance(
            vec![place("close", Some(10.0)), place("far", Some(900.0))],
            &bands,
            BandKind::Medium,
        );
        assert_eq!(names(&banded.short), vec!["close"]);
        assert_eq!(names(&banded.long), vec!["far"]);
    }

    #[test]
    fn missing_distance_uses_unknown_band() {
        let bands = TripBands::for_days(3);
        let banded = bucket_by_distance(vec![place("mystery", None)], &bands, BandKind::Long);
        assert_eq!(names(&banded.long), vec!["mystery"]);
    }

    #[test]
    fn rebalance_borrows_only_surplus() {
        let mut banded = BandedPlaces {
            short: (0..6).map(|i| place(&format!("s{}", i), Some(40.0))).collect(),
            medium: vec![place("m0", Some(80.0))],
            long: vec![],
        };

        rebalance_bands(&mut banded, 3);

        assert_eq!(banded.short.len(), 3);
        assert_eq!(banded.medium.len(), 3);
        assert_eq!(banded.long.len(), 1);
        assert_eq!(banded.len(), 7, "no place may be dropped");
        assert_eq!(names(&banded.medium), vec!["m0", "s3", "s4"]);
    }

    #[test]
    fn rebalance_without_surplus_is_a_no_op() {
        let mut banded = BandedPlaces {
            short: vec![place("s", Some(40.0))],
            medium: vec![place("m", Some(80.0))],
            long: vec![],
        };
        let before = banded.clone();
        rebalance_bands(&mut banded, 3);
        assert_eq!(banded, before);
    }

    #[test]
    fn truncate_respects_counts() {
        let bands = TripBands::for_days(3);
        let mut banded = BandedPlaces {
            short: (0..4).map(|i| place(&format!("s{}", i), Some(70.0))).collect(),
            medium: vec![],
            long: vec![],
        };
        truncate_bands(&mut banded, &bands);
        assert_eq!(banded.short.len(), 2);
    }
}

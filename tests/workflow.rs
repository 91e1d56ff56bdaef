//! End-to-end flows through the orchestrator: bulk ingest, index swaps,
//! per-query overrides, and the stale-index contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;
use vegam_db::{AnnoyIndex, DbError, IndexError, IvfIndex, SearchParams, VegamDb};

fn random_flat(n: usize, dim: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * dim).map(|_| rng.gen::<f32>() - 0.5).collect()
}

#[test]
fn ingest_search_persist_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.vgm");
    let (n, dim) = (500, 16);

    let mut db = VegamDb::new();
    db.add_batch(&random_flat(n, dim, 1), n, dim).unwrap();
    assert_eq!(db.len(), n);
    assert_eq!(db.dimension(), dim);

    // No index installed yet: the first search falls back to an exact scan.
    let query: Vec<f32> = db.store().get(7).unwrap().to_vec();
    let exact = db.search(&query, 10, None).unwrap();
    assert_eq!(exact.ids[0], 7);
    assert_eq!(exact.distances[0], 0.0);
    assert_eq!(db.index().unwrap().name(), "FlatIndex");

    // Swap in an IVF index; routing builds it on the next query.
    db.set_index(IvfIndex::new(10, dim).with_max_iters(15).with_seed(2));
    let probed = db
        .search(&query, 10, Some(&SearchParams::Ivf { n_probe: 10 }))
        .unwrap();
    assert_eq!(probed, exact);

    db.save(&path).unwrap();
    let mut reloaded = VegamDb::load(&path).unwrap();
    let again = reloaded
        .search(&query, 10, Some(&SearchParams::Ivf { n_probe: 10 }))
        .unwrap();
    assert_eq!(again, exact);
}

#[test]
fn param_kind_mismatch_surfaces_through_db() {
    let mut db = VegamDb::new();
    db.add_batch(&random_flat(50, 4, 3), 50, 4).unwrap();
    db.set_index(AnnoyIndex::new(4, 2, 5).with_seed(4));
    db.build_index().unwrap();

    let result = db.search(&[0.0; 4], 5, Some(&SearchParams::Ivf { n_probe: 1 }));
    assert!(matches!(
        result,
        Err(DbError::Index(IndexError::ParamKindMismatch { .. }))
    ));
}

#[test]
fn appended_vectors_are_invisible_until_rebuild() {
    let dim = 4;
    let mut db = VegamDb::new();
    db.add_batch(&random_flat(40, dim, 5), 40, dim).unwrap();
    db.set_index(
        AnnoyIndex::new(dim, 3, 4)
            .with_priority_queue(true)
            .with_search_k(1000)
            .with_seed(6),
    );
    db.build_index().unwrap();

    // Appending leaves the built forest stale: the new vector exists in the
    // store but no leaf bucket references it.
    let outlier = vec![100.0; dim];
    db.add(outlier.clone()).unwrap();
    let stale = db.search(&outlier, 5, None).unwrap();
    assert!(!stale.ids.contains(&40));

    db.build_index().unwrap();
    let fresh = db.search(&outlier, 5, None).unwrap();
    assert_eq!(fresh.ids[0], 40);
    assert_eq!(fresh.distances[0], 0.0);
}

#[test]
fn greedy_and_best_first_agree_on_small_forest() {
    let dim = 4;
    let mut db = VegamDb::new();
    db.add_batch(&random_flat(30, dim, 7), 30, dim).unwrap();
    db.set_index(AnnoyIndex::new(dim, 1, 30).with_seed(8));
    db.build_index().unwrap();

    // One tree whose root holds everything: both traversals see the same
    // single leaf, so both reduce to an exact scan.
    let query = vec![0.1; dim];
    let greedy = db
        .search(
            &query,
            5,
            Some(&SearchParams::Annoy {
                search_k: 30,
                use_priority_queue: false,
            }),
        )
        .unwrap();
    let best_first = db
        .search(
            &query,
            5,
            Some(&SearchParams::Annoy {
                search_k: 30,
                use_priority_queue: true,
            }),
        )
        .unwrap();
    assert_eq!(greedy, best_first);
    assert_eq!(greedy.len(), 5);
}

use decode::{recommend, ResultStreamParser};
use graph::{FieldLayout, GraphSnapshot, InteractionAggregator};
use lprec_core::model::NodeKind;
use tempfile::tempdir;

fn snapshot(pairs: &[(&str, &str)]) -> GraphSnapshot {
    let mut agg = InteractionAggregator::new(FieldLayout {
        user_field: 0,
        product_field: 1,
        sentinel: '\\',
    });
    for (user, product) in pairs {
        agg.accept(&[*user, *product]);
    }
    agg.finalize()
}

#[tokio::test]
async fn test_one_vector_per_user_in_discovery_order() {
    // ids: u1=0 lamp=1 u2=2 desk=3 chair=4 u3=5
    let graph = snapshot(&[
        ("u1", "lamp"),
        ("u2", "desk"),
        ("u2", "chair"),
        ("u3", "lamp"),
    ]);
    let n = graph.node_count();
    let d = graph.product_count();
    assert_eq!((n, d), (6, 3));

    let dir = tempdir().unwrap();
    let path = dir.path().join("orders_temp_U.mm");
    let mut body = String::from("%%MatrixMarket matrix array real general\n%%\n6 3\n");
    for i in 0..n * d {
        body.push_str(&format!("{}\n", i as f64 / 100.0));
    }
    tokio::fs::write(&path, body).await.unwrap();

    let mut parser = ResultStreamParser::open(&path, &graph.registry, d, 3)
        .await
        .unwrap();
    let mut seen = Vec::new();
    while let Some(vector) = parser.next_vector().await.unwrap() {
        assert_eq!(vector.scores.len(), d);
        assert_eq!(graph.registry.kind_of(vector.node_id).unwrap(), NodeKind::User);
        assert_eq!(vector.scores[0], (vector.node_id * d) as f64 / 100.0);
        seen.push(vector.node_id);
    }
    assert_eq!(seen, vec![0, 2, 5]);

    let stats = parser.finish().await.unwrap();
    assert_eq!(stats.values_consumed, n * d);
    assert_eq!(stats.user_vectors, graph.user_count());
}

#[tokio::test]
async fn test_decoded_rows_feed_top_k() {
    let graph = snapshot(&[("u1", "lamp"), ("u1", "desk"), ("u1", "chair")]);
    // u1 row, then three product rows
    let data = "0.1\n0.7\n0.7\n1\n1\n1\n2\n2\n2\n3\n3\n3\n";
    let mut parser = ResultStreamParser::new(data.as_bytes(), &graph.registry, 3);

    let vector = parser.next_vector().await.unwrap().unwrap();
    let user = graph.registry.label_of(vector.node_id).unwrap();
    let rec = recommend(user, &vector.scores, 5, &graph.positions).unwrap();
    let labels: Vec<&str> = rec.products.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["desk", "chair", "lamp"]);
    assert!(parser.next_vector().await.unwrap().is_none());
}

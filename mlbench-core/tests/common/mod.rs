use mlbench_core::Dataset;

/// Two separable clusters with `rows` rows in `dimensions` dimensions.
#[must_use]
pub fn separable(rows: usize, dimensions: usize) -> Dataset {
    let mut features = Vec::with_capacity(rows * dimensions);
    let mut labels = Vec::with_capacity(rows);
    for row in 0..rows {
        let label = u8::from(row % 2 == 1);
        for column in 0..dimensions {
            let hot = (column % 2 == 1) == (label == 1);
            features.push(if hot { 1.0 } else { 0.0 });
        }
        labels.push(label);
    }
    Dataset::from_parts("separable", features, labels, dimensions, 2).expect("valid fixture")
}

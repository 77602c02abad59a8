//! LTTB (Largest Triangle Three Buckets) downsampling for long series

/// Reduce `data` to `target` points keeping its visual shape. The first and
/// last points are always kept. `data` must be ordered by x.
pub fn lttb(data: &[[f64; 2]], target: usize) -> Vec<[f64; 2]> {
    profiling::scope!("lttb");

    if data.len() <= target || target < 3 {
        return data.to_vec();
    }

    let last = data.len() - 1;
    let mut result = Vec::with_capacity(target);
    result.push(data[0]);

    let bucket_size = (data.len() - 2) as f64 / (target - 2) as f64;
    let mut a = 0usize;

    for i in 0..(target - 2) {
        let bucket_start = (i as f64 * bucket_size).floor() as usize + 1;
        let bucket_end = (((i + 1) as f64 * bucket_size).floor() as usize + 1).min(last);

        // Average of the next bucket is the third triangle vertex
        let next_start = bucket_end;
        let next_end = (((i + 2) as f64 * bucket_size).floor() as usize + 1).min(data.len());
        let [avg_x, avg_y] = if next_start < next_end {
            let slice = &data[next_start..next_end];
            let n = slice.len() as f64;
            let (sx, sy) = slice.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
            [sx / n, sy / n]
        } else {
            data[last]
        };

        let [ax, ay] = data[a];
        let mut max_area = -1.0f64;
        let mut max_idx = bucket_start;
        for (j, &[bx, by]) in data.iter().enumerate().take(bucket_end).skip(bucket_start) {
            let area = ((ax - avg_x) * (by - ay) - (ax - bx) * (avg_y - ay)).abs();
            if area > max_area {
                max_area = area;
                max_idx = j;
            }
        }

        result.push(data[max_idx]);
        a = max_idx;
    }

    result.push(data[last]);
    result
}

pub fn is_sorted_by_x(data: &[[f64; 2]]) -> bool {
    data.windows(2).all(|w| w[0][0] <= w[1][0])
}

use serde::Serialize;

/// 单条预测：标签与归一化分数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// 一次分类调用的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationOutcome {
    /// 使用的模型标识符
    pub model_id: String,

    /// 被分类图片的标识符
    pub image_id: String,

    /// 按分数降序排列的top-k预测
    pub predictions: Vec<Prediction>,

    /// 总耗时（秒）
    pub processing_time: f32,
}

/// 数值稳定的softmax，将原始logits映射为[0,1]内、总和为1的分数
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|v| v / sum).collect()
}

/// 分数按降序排列并截断到top-k
///
/// 稳定排序：相同分数按原始标签索引顺序，保证结果可复现。
pub fn rank(scores: &[f32], labels: &[String], top_k: usize) -> Vec<Prediction> {
    let count = scores.len().min(labels.len());
    let mut indices: Vec<usize> = (0..count).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    indices
        .into_iter()
        .take(top_k)
        .map(|i| Prediction {
            label: labels[i].clone(),
            score: scores[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn softmax_sums_to_one_and_stays_in_unit_interval() {
        let scores = softmax(&[1.0, 2.0, 3.0, -1.0]);

        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn softmax_handles_large_logits_without_overflow() {
        let scores = softmax(&[1000.0, 1001.0]);
        assert!(scores.iter().all(|s| s.is_finite()));
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn rank_orders_descending_and_truncates() {
        let labels = labels(&["a", "b", "c", "d"]);
        let predictions = rank(&[0.1, 0.4, 0.2, 0.3], &labels, 3);

        let names: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "c"]);
        assert!(predictions.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_break_by_original_label_index() {
        let labels = labels(&["first", "second", "third"]);
        let predictions = rank(&[0.5, 0.5, 0.5], &labels, 3);

        let names: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn top_k_larger_than_label_space_returns_everything() {
        let labels = labels(&["a", "b"]);
        let predictions = rank(&[0.9, 0.1], &labels, 5);
        assert_eq!(predictions.len(), 2);
    }

    #[test]
    fn ranking_is_deterministic() {
        let labels = labels(&["a", "b", "c", "d", "e"]);
        let scores = softmax(&[0.3, 0.3, 2.0, -1.0, 0.3]);

        assert_eq!(rank(&scores, &labels, 5), rank(&scores, &labels, 5));
    }
}

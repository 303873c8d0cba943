pub const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

// 进度条格数与字符
const PROGRESS_CELLS: usize = 12;
const PROGRESS_FILLED: char = '■';
const PROGRESS_EMPTY: char = '□';

pub struct FormatTool;

impl FormatTool {
    // 格式化文件大小，超过 PB 之后不再进位
    pub fn format_size(size: u64) -> String {
        if size == 0 {
            return "0B".to_string();
        }

        let mut value = size as f64;
        let mut index = 0;
        while value >= 1024.0 && index < SIZE_UNITS.len() - 1 {
            value /= 1024.0;
            index += 1;
        }

        format!("{:.2}{}", value, SIZE_UNITS[index])
    }

    // 格式化时长，例如 3661 -> 1h1m1s，0 -> 空字符串
    pub fn format_duration(seconds: u64) -> String {
        let periods = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];
        let mut remaining = seconds;
        let mut result = String::new();
        for (name, period) in periods {
            if remaining >= period {
                result.push_str(&format!("{}{}", remaining / period, name));
                remaining %= period;
            }
        }
        result
    }

    // 解析 H:MM:SS / MM:SS / SS 形式的时长，失败时返回 0
    pub fn parse_duration(text: &str) -> f64 {
        let parts: Vec<&str> = text.trim().split(':').collect();
        let numbers: Option<Vec<f64>> = parts.iter().map(|p| p.trim().parse::<f64>().ok()).collect();
        let Some(numbers) = numbers else {
            return 0.0;
        };

        match numbers.as_slice() {
            [h, m, s] => h * 3600.0 + m * 60.0 + s,
            [m, s] => m * 60.0 + s,
            [s] => *s,
            _ => 0.0,
        }
    }

    /// 解析速率字符串（例如 `2k`、`1.5M`）为字节数。
    ///
    /// 后缀按 k、m、g、t、b 的顺序检测，先命中者生效；无法识别时返回 0。
    pub fn parse_rate(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let suffixes = [('k', 1), ('m', 2), ('g', 3), ('t', 4), ('b', 0)];

        for (suffix, power) in suffixes {
            if let Some(pos) = lower.find(suffix) {
                let number = lower[..pos].trim().parse::<f64>().unwrap_or(0.0);
                return number * 1024f64.powi(power);
            }
        }
        0.0
    }

    // 将 "NN.NN%" 渲染为 12 格进度条
    pub fn progress_bar(pct: &str) -> String {
        let value = pct.trim().trim_end_matches('%').trim().parse::<f64>().unwrap_or(0.0);
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) };
        let filled = ((value / 8.0).floor() as usize).min(PROGRESS_CELLS);

        let mut bar = String::with_capacity(PROGRESS_CELLS * 3 + 2);
        bar.push('[');
        bar.extend(std::iter::repeat_n(PROGRESS_FILLED, filled));
        bar.extend(std::iter::repeat_n(PROGRESS_EMPTY, PROGRESS_CELLS - filled));
        bar.push(']');
        bar
    }

    // 格式化百分比，保留两位小数
    pub fn format_percent(done: u64, total: u64) -> String {
        if total == 0 {
            return "0.00%".to_string();
        }
        format!("{:.2}%", done.min(total) as f64 * 100.0 / total as f64)
    }

    // 根据剩余字节与速度估算 ETA
    pub fn format_eta(done: u64, total: u64, speed: u64) -> String {
        if speed == 0 || done >= total {
            return "-".to_string();
        }
        Self::format_duration((total - done) / speed)
    }

    pub fn format_speed(speed: u64) -> String {
        format!("{}/s", Self::format_size(speed))
    }
}

/// 转义状态消息中使用的 HTML 子集字符
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

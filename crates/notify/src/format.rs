//! 报告中的数字格式：千分位、卢比金额、市值。

use rust_decimal::Decimal;

/// 占位符，用于缺失或无意义的字段
pub const NOT_AVAILABLE: &str = "N/A";

/// 为整数部分加上千分位逗号，保留符号与小数部分。
pub fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// `₹1234.50`，不分组。
pub fn rupees(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

/// `₹1,234.50`，分组。
pub fn rupees_grouped(amount: Decimal) -> String {
    format!("₹{}", group_thousands(&format!("{:.2}", amount.round_dp(2))))
}

/// 非正数价格显示为 `N/A`。
pub fn optional_rupees(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        rupees(amount)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// `19.90%`
pub fn percent(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

/// 价格带取整显示：`20%`
pub fn band(value: Decimal) -> String {
    format!("{:.0}%", value.round_dp(0))
}

/// `₹12,345 Cr`；缺失显示 `N/A`。
pub fn market_cap(crore: Option<f64>) -> String {
    match crore {
        Some(value) if value.is_finite() && value > 0.0 => {
            format!("₹{} Cr", group_thousands(&format!("{:.0}", value)))
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// 成交量取整并分组；零显示 `N/A`。
pub fn volume(value: Decimal) -> String {
    if value > Decimal::ZERO {
        group_thousands(&format!("{:.0}", value.round_dp(0)))
    } else {
        NOT_AVAILABLE.to_string()
    }
}

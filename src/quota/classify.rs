/// 远端响应的分类结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// 404：远端没有这条记录，视为无需处理。
    NotFound,
    Failure,
}

/// < 300 成功；404 容忍为成功；其余 >= 300 一律失败。
pub fn classify(status: u16) -> Classification {
    match status {
        s if s < 300 => Classification::Success,
        404 => Classification::NotFound,
        _ => Classification::Failure,
    }
}

// ==========================================
// 取件账户分配系统 - 分配尝试状态机
// ==========================================
// 转移: (当前状态, 已提交数, 需求量) → 下一状态
//   任意非终态 + committed >= amount → Fulfilled
//   Attempt1 → Attempt2Redistribute (配额重分, 占用偏移 +1, 重新分配)
//   Attempt2Redistribute → Attempt3AcceptBestEffort (接受尝试2的结果)
// 终态: Fulfilled / Attempt3AcceptBestEffort
// ==========================================

use crate::domain::types::AttemptState;

/// 状态转移函数 (纯函数)
pub fn next_state(state: AttemptState, committed: usize, amount: usize) -> AttemptState {
    if is_terminal(state) {
        return state;
    }
    if committed >= amount {
        return AttemptState::Fulfilled;
    }
    match state {
        AttemptState::Attempt1 => AttemptState::Attempt2Redistribute,
        _ => AttemptState::Attempt3AcceptBestEffort,
    }
}

pub fn is_terminal(state: AttemptState) -> bool {
    matches!(
        state,
        AttemptState::Fulfilled | AttemptState::Attempt3AcceptBestEffort
    )
}

/// 该状态是否需要执行一轮分配
pub fn runs_allocation(state: AttemptState) -> bool {
    matches!(
        state,
        AttemptState::Attempt1 | AttemptState::Attempt2Redistribute
    )
}

/// 地址并发占用的偏移量
pub fn occupancy_offset(state: AttemptState) -> i64 {
    match state {
        AttemptState::Attempt1 => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfilled_on_first_attempt() {
        assert_eq!(next_state(AttemptState::Attempt1, 3, 3), AttemptState::Fulfilled);
    }

    #[test]
    fn test_escalation_path() {
        let s = next_state(AttemptState::Attempt1, 1, 3);
        assert_eq!(s, AttemptState::Attempt2Redistribute);
        assert!(runs_allocation(s));
        assert_eq!(occupancy_offset(s), 1);

        let s = next_state(s, 2, 3);
        assert_eq!(s, AttemptState::Attempt3AcceptBestEffort);
        assert!(is_terminal(s));
        assert!(!runs_allocation(s));

        // 终态不再转移
        assert_eq!(next_state(s, 3, 3), AttemptState::Attempt3AcceptBestEffort);
    }

    #[test]
    fn test_second_attempt_can_fulfil() {
        assert_eq!(
            next_state(AttemptState::Attempt2Redistribute, 4, 4),
            AttemptState::Fulfilled
        );
    }
}

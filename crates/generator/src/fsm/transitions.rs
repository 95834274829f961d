//! 状态迁移表

use std::collections::{HashMap, HashSet, VecDeque};

use rand::distributions::{Distribution, WeightedIndex};

use super::types::{EventType, State};
use crate::rng::SharedRng;

/// 一条候选迁移
///
/// `next_state` 为 None 表示"返回"：实际去向由会话的上一个状态决定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub event: EventType,
    pub next_state: Option<State>,
    pub weight: f64,
}

impl Transition {
    pub const fn to(event: EventType, next: State, weight: f64) -> Self {
        Self {
            event,
            next_state: Some(next),
            weight,
        }
    }

    pub const fn back(weight: f64) -> Self {
        Self {
            event: EventType::Back,
            next_state: None,
            weight,
        }
    }
}

struct Row {
    transitions: Vec<Transition>,
    /// 权重全为 0、含负数或列表为空时为 None
    dist: Option<WeightedIndex<f64>>,
}

impl Row {
    fn new(transitions: Vec<Transition>) -> Self {
        let dist = WeightedIndex::new(transitions.iter().map(|t| t.weight)).ok();
        Self { transitions, dist }
    }
}

/// 只读的状态迁移表，运行期由所有 worker 共享
pub struct TransitionTable {
    rows: HashMap<State, Row>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransitionTable {
    /// 商城用户行为模型
    pub fn standard() -> Self {
        use EventType as E;
        use State as S;

        Self::from_rows([
            (
                S::Browsing,
                vec![
                    Transition::to(E::SearchSubmitted, S::Search, 0.3),
                    Transition::to(E::ProductClicked, S::Click, 0.2),
                    Transition::to(E::EventPageClicked, S::EventBrowsing, 0.2),
                    Transition::to(E::CategoryClicked, S::Click, 0.2),
                    Transition::to(E::PageViewed, S::Browsing, 0.5),
                    Transition::to(E::Exit, S::Exit, 0.5),
                ],
            ),
            (
                S::EventBrowsing,
                vec![Transition::back(0.7), Transition::to(E::Exit, S::Exit, 0.3)],
            ),
            (
                S::Search,
                vec![
                    Transition::to(E::ProductClicked, S::Click, 0.6),
                    Transition::to(E::PageViewed, S::NextPage, 0.1),
                    Transition::back(0.2),
                    Transition::to(E::Exit, S::Exit, 0.1),
                ],
            ),
            (
                S::NextPage,
                vec![
                    Transition::to(E::ProductClicked, S::Click, 0.6),
                    Transition::to(E::PageViewed, S::NextPage, 0.2),
                    Transition::back(0.1),
                    Transition::to(E::Exit, S::Exit, 0.1),
                ],
            ),
            (
                S::Click,
                vec![
                    Transition::to(E::AddToCart, S::AddToCart, 0.4),
                    Transition::to(E::Purchased, S::Purchase, 0.4),
                    Transition::back(0.1),
                    Transition::to(E::Exit, S::Exit, 0.1),
                ],
            ),
            (
                S::AddToCart,
                vec![
                    Transition::to(E::Purchased, S::Purchase, 0.7),
                    Transition::back(0.2),
                    Transition::to(E::Exit, S::Exit, 0.1),
                ],
            ),
            (S::Purchase, vec![Transition::to(E::Exit, S::Exit, 1.0)]),
            (S::Exit, Vec::new()),
        ])
    }

    /// 用自定义行构建迁移表，测试中可替换模型
    pub fn from_rows(rows: impl IntoIterator<Item = (State, Vec<Transition>)>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|(state, transitions)| (state, Row::new(transitions)))
                .collect(),
        }
    }

    /// 某状态的候选迁移，未登记的状态返回空切片
    pub fn transitions(&self, state: State) -> &[Transition] {
        self.rows
            .get(&state)
            .map(|row| row.transitions.as_slice())
            .unwrap_or(&[])
    }

    /// 按权重随机选一条迁移
    ///
    /// 权重无需归一化；列表为空或权重总和为 0 时返回 None。
    pub fn choose(&self, state: State, rng: &SharedRng) -> Option<&Transition> {
        let row = self.rows.get(&state)?;
        let dist = row.dist.as_ref()?;
        let idx = rng.with(|r| dist.sample(r));
        row.transitions.get(idx)
    }

    /// 按 `State::ALL` 顺序遍历已登记的行
    pub fn rows(&self) -> impl Iterator<Item = (State, &[Transition])> + '_ {
        State::ALL
            .into_iter()
            .filter_map(|state| self.rows.get(&state).map(|row| (state, row.transitions.as_slice())))
    }

    /// 权重为正的出边指向的状态
    ///
    /// "返回"边按起始状态计：任何上一个状态本身都可从起始状态到达。
    fn successors(&self, state: State) -> impl Iterator<Item = State> + '_ {
        self.transitions(state)
            .iter()
            .filter(|t| t.weight > 0.0)
            .map(|t| t.next_state.unwrap_or(State::START))
    }

    /// 从 `state` 出发（含自身）可到达的全部状态
    pub fn reachable_from(&self, state: State) -> HashSet<State> {
        let mut seen = HashSet::from([state]);
        let mut queue = VecDeque::from([state]);
        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    pub fn can_reach_exit(&self, state: State) -> bool {
        self.reachable_from(state).contains(&State::Exit)
    }

    /// 有出边却到不了 exit 的状态（吸收环），正常模型应为空
    pub fn states_without_exit(&self) -> Vec<State> {
        self.rows()
            .filter(|(_, transitions)| !transitions.is_empty())
            .map(|(state, _)| state)
            .filter(|&state| !self.can_reach_exit(state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_shape() {
        let table = TransitionTable::standard();
        assert_eq!(table.transitions(State::Browsing).len(), 6);
        assert_eq!(table.transitions(State::Purchase).len(), 1);
        assert!(table.transitions(State::Exit).is_empty());
        assert!(table.transitions(State::None).is_empty());
        assert_eq!(table.rows().count(), 8);
    }

    #[test]
    fn test_back_transitions_have_no_literal_target() {
        let table = TransitionTable::standard();
        for (_, transitions) in table.rows() {
            for t in transitions {
                assert_eq!(t.event == EventType::Back, t.next_state.is_none());
            }
        }
    }

    #[test]
    fn test_every_state_reaches_exit() {
        let table = TransitionTable::standard();
        assert!(table.states_without_exit().is_empty());
        for state in State::ALL {
            assert!(table.can_reach_exit(state), "{state} 无法到达 exit");
        }
    }

    #[test]
    fn test_absorbing_cycle_detected() {
        let table = TransitionTable::from_rows([
            (
                State::Browsing,
                vec![
                    Transition::to(EventType::PageViewed, State::Browsing, 1.0),
                    Transition::to(EventType::Exit, State::Exit, 0.0),
                ],
            ),
            (State::Exit, Vec::new()),
        ]);
        assert_eq!(table.states_without_exit(), vec![State::Browsing]);
    }

    #[test]
    fn test_choose_zero_weight_mass() {
        let table = TransitionTable::from_rows([(
            State::Browsing,
            vec![Transition::to(EventType::PageViewed, State::Browsing, 0.0)],
        )]);
        let rng = SharedRng::seeded(1);
        assert!(table.choose(State::Browsing, &rng).is_none());
        assert!(table.choose(State::Search, &rng).is_none());
    }

    #[test]
    fn test_choose_single_transition() {
        let table = TransitionTable::standard();
        let rng = SharedRng::seeded(2);
        for _ in 0..20 {
            let t = table.choose(State::Purchase, &rng).unwrap();
            assert_eq!(t.event, EventType::Exit);
        }
        assert!(table.choose(State::Exit, &rng).is_none());
    }
}

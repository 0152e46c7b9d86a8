// ==========================================
// 赛事晋级管理系统 - 轮次数据仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 晋级/赛务控制的所有写入都发生在引擎持有的同一事务内,
//       因此本模块以 *_tx(conn) 关联函数为主, 实例方法只做便捷读取
// ==========================================

mod action;
mod participant;
mod result;
mod round;
mod score;

pub use action::RoundActionRepository;
pub use participant::RoundParticipantRepository;
pub use result::RoundResultRepository;
pub use round::RoundRepository;
pub use score::RoundScoreRepository;

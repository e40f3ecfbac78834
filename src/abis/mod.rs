pub mod erc20;
pub mod multicall;
pub mod v3;

pub use erc20::IERC20;
pub use multicall::{Call3, IMulticall3, McResult};
pub use v3::{CollectParams, DecreaseLiquidityParams, INonfungiblePositionManager, IUniswapV3Pool};

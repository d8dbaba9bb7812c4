//! 方法描述（method）
//!
//! - `Method`：一次写操作的请求描述（目标、参数、请求体、传输配置）；
//! - `SilentMethod`：排队中的调用描述符，携带重试预算与运行时回调；
//! - `MethodHandlers`：挂在单个描述符上的回调（fallback、入队前、入队后）；
//! - `SerializedSilentMethod`：描述符的持久化形态，只含数据、不含回调。
//!
mod handlers;
mod request;
mod serialized;
mod silent_method;

pub use handlers::{MethodHandlers, PushQueueHandlerFn, PushedQueueHandlerFn, SubmitHandlerFn};
pub use request::{Method, MethodType};
pub use serialized::{SerializedSilentMethod, StoredMethod};
pub use silent_method::SilentMethod;

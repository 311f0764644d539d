/// 内部导出的模块
mod internal;


/// 导出核心入口函数
pub use internal::entrance::remote::*;

pub mod auth {
    use crate::internal;
    pub use internal::auth::*;
    pub use internal::auth::structs::webdav_auth::WebdavAuth;
}

/// 对外提供webdav基础能力，不能限制死在入口函数中，以防有人自己要用
pub mod webdav {
    pub mod functions {
        use crate::internal;
        pub use internal::webdav::functions::format_url_path::*;
    }

    pub mod structs {
        pub use crate::internal::webdav::raw_xml::dav_error::*;
    }

    pub mod impl_traits {
        pub use crate::internal::webdav::impl_traits::impl_status_decoder::*;
    }
}

pub mod states {
    pub mod unlock_reactive {
        use crate::internal;
        pub use internal::states::unlock_reactive::*;
    }
}

/// 下载器：类型与入口（以 lib 为中心，此处统一导出）
pub mod downloader {
    use crate::internal;
    pub use internal::downloader::constants::*;
    pub use internal::downloader::impl_traits::impl_probe::*;
    pub use internal::downloader::impl_traits::impl_status_decoder::*;
    pub use internal::downloader::structs::*;
    pub use internal::downloader::traits::probe::*;
    pub use internal::downloader::traits::status_decoder::*;
    pub use internal::downloader::traits::writer_at::*;
}

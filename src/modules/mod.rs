pub mod convert {
    pub mod model;
    pub mod intake;
    pub mod compression;
    pub mod assembler;
    pub mod sink;
    pub mod service;
    pub mod handle;
    pub mod route;
}
pub mod health {
    pub mod schema;
    pub mod handle;
    pub mod route;
}

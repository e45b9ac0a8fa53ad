mod request;
mod response;

pub use request::{AnalyzeRequest, CreateBBoxRequest, CreateGeoJsonRequest, IndexQuery};
pub use response::{
    AnalyzeResponse, IntersectResponse, RoiListItem, RoiListResponse, RoiResponse, StatusResponse,
};

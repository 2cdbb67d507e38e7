//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod air_sensor;
pub mod auth_token;
pub mod boiler;
pub mod boiler_room;
pub mod bus;
pub mod call_request;
pub mod call_request_timeline;
pub mod construction_mission;
pub mod construction_site;
pub mod coordinate;
pub mod device_health;
pub mod district;
pub mod eco_violation;
pub mod facility;
pub mod facility_boiler;
pub mod iot_device;
pub mod light_pole;
pub mod light_roi;
pub mod moisture_sensor;
pub mod notification;
pub mod organization;
pub mod pole_roi;
pub mod region;
pub mod report_entry;
pub mod responsible_org;
pub mod room;
pub mod site_mission;
pub mod sos_column;
pub mod truck;
pub mod types;
pub mod user;
pub mod utility_node;
pub mod waste_bin;

// Re-export specific types to avoid conflicts
pub use air_sensor::{Column as AirSensorColumn, Entity as AirSensor, Model as AirSensorModel};
pub use auth_token::{Column as AuthTokenColumn, Entity as AuthToken, Model as AuthTokenModel};
pub use boiler::{Column as BoilerColumn, Entity as Boiler, Model as BoilerModel};
pub use boiler_room::{Column as BoilerRoomColumn, Entity as BoilerRoom};
pub use bus::{Column as BusColumn, Entity as Bus, Model as BusModel};
pub use call_request::{
    Column as CallRequestColumn, Entity as CallRequest, Model as CallRequestModel,
};
pub use call_request_timeline::{
    Column as TimelineColumn, Entity as CallRequestTimeline, Model as TimelineModel,
};
pub use construction_mission::{
    Column as MissionColumn, Entity as ConstructionMission, Model as MissionModel,
};
pub use construction_site::{
    Column as SiteColumn, Entity as ConstructionSite, Model as SiteModel,
};
pub use coordinate::{Column as CoordinateColumn, Entity as Coordinate, Model as CoordinateModel};
pub use device_health::{
    Column as DeviceHealthColumn, Entity as DeviceHealth, Model as DeviceHealthModel,
};
pub use district::{Column as DistrictColumn, Entity as District, Model as DistrictModel};
pub use eco_violation::{
    Column as EcoViolationColumn, Entity as EcoViolation, Model as EcoViolationModel,
};
pub use facility::{Column as FacilityColumn, Entity as Facility, Model as FacilityModel};
pub use facility_boiler::{Column as FacilityBoilerColumn, Entity as FacilityBoiler};
pub use iot_device::{Column as IotDeviceColumn, Entity as IotDevice, Model as IotDeviceModel};
pub use light_pole::{Column as LightPoleColumn, Entity as LightPole, Model as LightPoleModel};
pub use light_roi::{Column as LightRoiColumn, Entity as LightRoi, Model as LightRoiModel};
pub use moisture_sensor::{
    Column as MoistureSensorColumn, Entity as MoistureSensor, Model as MoistureSensorModel,
};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use organization::{
    Column as OrganizationColumn, Entity as Organization, Model as OrganizationModel,
};
pub use pole_roi::{Column as PoleRoiColumn, Entity as PoleRoi};
pub use region::{Column as RegionColumn, Entity as Region, Model as RegionModel};
pub use report_entry::{
    Column as ReportEntryColumn, Entity as ReportEntry, Model as ReportEntryModel,
};
pub use responsible_org::{
    Column as ResponsibleOrgColumn, Entity as ResponsibleOrg, Model as ResponsibleOrgModel,
};
pub use room::{Column as RoomColumn, Entity as Room, Model as RoomModel};
pub use site_mission::{Column as SiteMissionColumn, Entity as SiteMission};
pub use sos_column::{Column as SosColumnColumn, Entity as SosColumn, Model as SosColumnModel};
pub use truck::{Column as TruckColumn, Entity as Truck, Model as TruckModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use utility_node::{
    Column as UtilityNodeColumn, Entity as UtilityNode, Model as UtilityNodeModel,
};
pub use waste_bin::{Column as WasteBinColumn, Entity as WasteBin, Model as WasteBinModel};
